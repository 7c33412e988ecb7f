//! Startup configuration sourced from environment variables.
//!
//! Required variables are `CLIENT_ID`, `CLIENT_SECRET`, `DEVICE_ID`, and `API_BASE_URL`.
//! Optional tuning knobs are `LOCK_STRATEGY` (`ticket` | `shadow`), `REQUEST_TIMEOUT_SECS`,
//! and `LOCAL_UTC_OFFSET` (`±HH:MM`, used to interpret naive caller timestamps).

// crates.io
use time::macros::format_description;
// self
use crate::{_prelude::*, auth::Secret, error::ConfigError, lock::LockCommandStrategy};

/// Immutable client identity and target device.
#[derive(Clone)]
pub struct Credentials {
	/// Vendor project client identifier.
	pub client_id: String,
	/// Vendor project secret keying every request signature.
	pub client_secret: Secret,
	/// Lock device receiving the access codes.
	pub device_id: String,
}
impl Credentials {
	/// Bundles the three identity values.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		device_id: impl Into<String>,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: Secret::new(client_secret),
			device_id: device_id.into(),
		}
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &"<redacted>")
			.field("client_secret", &"<redacted>")
			.field("device_id", &"<redacted>")
			.finish()
	}
}

/// Validated broker configuration.
#[derive(Clone, Debug)]
pub struct Config {
	/// Client identity and device.
	pub credentials: Credentials,
	/// Region-specific vendor endpoint.
	pub api_base_url: Url,
	/// Device command strategy.
	pub strategy: LockCommandStrategy,
	/// Upper bound for every outbound HTTP call.
	pub request_timeout: Duration,
	/// Offset applied to the naive timestamps supplied by callers.
	pub local_offset: UtcOffset,
}
impl Config {
	/// Default outbound request timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(10);

	/// Loads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads the configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let optional = |name: &'static str| {
			lookup(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
		};
		let required =
			|name: &'static str| optional(name).ok_or(ConfigError::MissingVariable { name });
		let credentials = Credentials::new(
			required("CLIENT_ID")?,
			required("CLIENT_SECRET")?,
			required("DEVICE_ID")?,
		);
		let api_base_url = Url::parse(&required("API_BASE_URL")?)
			.map_err(|source| ConfigError::InvalidUrl { source })?;
		let strategy = match optional("LOCK_STRATEGY") {
			Some(raw) => raw.parse()?,
			None => LockCommandStrategy::default(),
		};
		let request_timeout = match optional("REQUEST_TIMEOUT_SECS") {
			Some(raw) => parse_timeout(&raw)?,
			None => Self::DEFAULT_TIMEOUT,
		};
		let local_offset = match optional("LOCAL_UTC_OFFSET") {
			Some(raw) => parse_offset(&raw)?,
			None => UtcOffset::UTC,
		};

		Ok(Self { credentials, api_base_url, strategy, request_timeout, local_offset })
	}
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
	let invalid =
		|reason: String| ConfigError::InvalidVariable { name: "REQUEST_TIMEOUT_SECS", reason };
	let secs = raw.parse::<i64>().map_err(|e| invalid(e.to_string()))?;

	if secs <= 0 {
		return Err(invalid("timeout must be positive".into()));
	}

	Ok(Duration::seconds(secs))
}

fn parse_offset(raw: &str) -> Result<UtcOffset, ConfigError> {
	UtcOffset::parse(raw, format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
		.map_err(|e| ConfigError::InvalidVariable {
			name: "LOCAL_UTC_OFFSET",
			reason: e.to_string(),
		})
}
