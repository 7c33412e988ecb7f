//! Smart-lock access code issuance on top of [`AuthClient`].
//!
//! Two device-command strategies exist because the vendor API evolved: the dedicated
//! temporary-password endpoint guarded by a ticket ([`LockCommandStrategy::TicketPassword`])
//! and a generic shadow-property write of DP 11 ([`LockCommandStrategy::ShadowProperty`]).
//! Both share the same signed-request plumbing and report an [`IssuedCode`].

pub mod shadow;
pub mod ticket;

pub use shadow::ShadowPassword;
pub use ticket::TicketPassword;

// crates.io
use time::macros::format_description;
// self
use crate::{
	_prelude::*,
	client::AuthClient,
	error::{ConfigError, ValidationError},
	http::VendorHttpClient,
	obs::{self, CallKind, CallOutcome, CallSpan},
};
#[cfg(feature = "reqwest")] use crate::{config::Config, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Issuer specialized for the crate's default reqwest transport.
pub type ReqwestLockCommandIssuer = LockCommandIssuer<ReqwestHttpClient>;

/// Device-command strategy used to install an access code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockCommandStrategy {
	/// Ticket + temporary-password device endpoint.
	TicketPassword,
	#[default]
	/// Shadow-property write of DP 11.
	ShadowProperty,
}
impl LockCommandStrategy {
	/// Returns a stable label suitable for configuration and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			LockCommandStrategy::TicketPassword => "ticket",
			LockCommandStrategy::ShadowProperty => "shadow",
		}
	}
}
impl Display for LockCommandStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for LockCommandStrategy {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"ticket" | "ticket_password" => Ok(Self::TicketPassword),
			"shadow" | "shadow_property" => Ok(Self::ShadowProperty),
			other => Err(ConfigError::UnknownStrategy(other.to_owned())),
		}
	}
}

/// Caller request for a time-bounded access code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCodeRequest {
	/// Name shown for the code holder on the device.
	#[serde(rename = "name")]
	pub holder_name: String,
	/// First instant the code works (`YYYY-MM-DD HH:MM:SS`).
	pub start_time: String,
	/// Instant the code stops working (`YYYY-MM-DD HH:MM:SS`).
	pub end_time: String,
}
impl AccessCodeRequest {
	/// Bundles the three caller fields.
	pub fn new(
		holder_name: impl Into<String>,
		start_time: impl Into<String>,
		end_time: impl Into<String>,
	) -> Self {
		Self {
			holder_name: holder_name.into(),
			start_time: start_time.into(),
			end_time: end_time.into(),
		}
	}

	/// Checks presence and format of every field, returning the parsed window.
	///
	/// The window order is not enforced: a request whose end precedes its start is passed on
	/// to the vendor unchanged.
	pub fn validate(&self) -> Result<ValidatedWindow, ValidationError> {
		if self.holder_name.trim().is_empty() {
			return Err(ValidationError::MissingField("name"));
		}

		let start = parse_input_time("start_time", &self.start_time)?;
		let end = parse_input_time("end_time", &self.end_time)?;

		#[cfg(feature = "tracing")]
		if start >= end {
			tracing::warn!(
				start_time = %self.start_time,
				end_time = %self.end_time,
				"access code window ends before it starts"
			);
		}

		Ok(ValidatedWindow { start, end })
	}
}

/// Parsed, naive validity window of an [`AccessCodeRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatedWindow {
	/// Naive start instant.
	pub start: PrimitiveDateTime,
	/// Naive end instant.
	pub end: PrimitiveDateTime,
}

/// Access code installed on the device; the vendor remains the system of record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssuedCode {
	/// Code created through the temporary-password endpoint.
	Ticket(TicketPassword),
	/// Code written through the DP 11 shadow property.
	Shadow(ShadowPassword),
}
impl IssuedCode {
	/// Numeric code to type on the keypad.
	pub fn password(&self) -> &str {
		match self {
			IssuedCode::Ticket(code) => &code.password,
			IssuedCode::Shadow(code) => &code.password,
		}
	}

	/// Name of the code holder.
	pub fn holder_name(&self) -> &str {
		match self {
			IssuedCode::Ticket(code) => &code.name,
			IssuedCode::Shadow(code) => &code.name,
		}
	}

	/// Vendor password id or synthesized user slot.
	pub fn identifier(&self) -> String {
		match self {
			IssuedCode::Ticket(code) => code.id.clone(),
			IssuedCode::Shadow(code) => code.user_id.to_string(),
		}
	}
}

/// Builds device payloads and interprets the vendor's answers.
pub struct LockCommandIssuer<C>
where
	C: ?Sized + VendorHttpClient,
{
	/// Shared signed-request client.
	pub client: Arc<AuthClient<C>>,
	/// Lock device receiving the codes.
	pub device_id: String,
	/// Device-command strategy.
	pub strategy: LockCommandStrategy,
	/// Offset applied to naive caller timestamps.
	pub local_offset: UtcOffset,
}
impl<C> LockCommandIssuer<C>
where
	C: ?Sized + VendorHttpClient,
{
	/// Creates an issuer interpreting caller timestamps as UTC.
	pub fn new(
		client: Arc<AuthClient<C>>,
		device_id: impl Into<String>,
		strategy: LockCommandStrategy,
	) -> Self {
		Self { client, device_id: device_id.into(), strategy, local_offset: UtcOffset::UTC }
	}

	/// Overrides the offset used for naive caller timestamps.
	pub fn with_local_offset(mut self, offset: UtcOffset) -> Self {
		self.local_offset = offset;

		self
	}

	/// Installs a time-bounded access code on the device.
	///
	/// Input is validated before any vendor call is made.
	pub async fn issue_temporary_code(&self, request: &AccessCodeRequest) -> Result<IssuedCode> {
		const KIND: CallKind = CallKind::IssueCode;

		let span = CallSpan::new(KIND, self.strategy.as_str());

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async {
				let window = request.validate()?;

				match self.strategy {
					LockCommandStrategy::TicketPassword =>
						self.issue_ticket_password(request, window).await.map(IssuedCode::Ticket),
					LockCommandStrategy::ShadowProperty =>
						self.issue_shadow_password(request, window).await.map(IssuedCode::Shadow),
				}
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}
#[cfg(feature = "reqwest")]
impl LockCommandIssuer<ReqwestHttpClient> {
	/// Builds a reqwest-backed issuer from validated configuration.
	pub fn from_config(config: &Config) -> Result<Self> {
		let client = Arc::new(AuthClient::from_config(config)?);

		Ok(Self::new(client, config.credentials.device_id.clone(), config.strategy)
			.with_local_offset(config.local_offset))
	}
}
impl<C> Debug for LockCommandIssuer<C>
where
	C: ?Sized + VendorHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LockCommandIssuer")
			.field("client", &self.client)
			.field("strategy", &self.strategy)
			.field("local_offset", &self.local_offset)
			.finish()
	}
}

fn parse_input_time(
	field: &'static str,
	value: &str,
) -> Result<PrimitiveDateTime, ValidationError> {
	if value.trim().is_empty() {
		return Err(ValidationError::MissingField(field));
	}

	let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

	PrimitiveDateTime::parse(value, format)
		.map_err(|_| ValidationError::InvalidTime { field, value: value.to_owned() })
}

/// Formats a naive instant as `YYYY-MM-DDTHH:MM:SS`.
pub(crate) fn iso(naive: PrimitiveDateTime) -> String {
	// Every component of the description is always representable.
	let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

	naive.format(format).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn strategy_labels_round_trip_through_from_str() {
		for strategy in [LockCommandStrategy::TicketPassword, LockCommandStrategy::ShadowProperty] {
			assert_eq!(strategy.as_str().parse::<LockCommandStrategy>().ok(), Some(strategy));
		}

		assert_eq!(
			"SHADOW".parse::<LockCommandStrategy>().ok(),
			Some(LockCommandStrategy::ShadowProperty)
		);
		assert!(matches!(
			"ble".parse::<LockCommandStrategy>(),
			Err(ConfigError::UnknownStrategy(label)) if label == "ble"
		));
	}

	#[test]
	fn validate_parses_window() {
		let request = AccessCodeRequest::new("Alice", "2024-01-01 10:00:00", "2024-01-02 10:00:00");
		let window = request.validate().expect("Well-formed request should validate.");

		assert_eq!(iso(window.start), "2024-01-01T10:00:00");
		assert_eq!(iso(window.end), "2024-01-02T10:00:00");
	}

	#[test]
	fn validate_reports_first_missing_field() {
		let cases = [
			(AccessCodeRequest::new("", "2024-01-01 10:00:00", "2024-01-02 10:00:00"), "name"),
			(AccessCodeRequest::new("Bob", " ", "2024-01-02 10:00:00"), "start_time"),
			(AccessCodeRequest::new("Bob", "2024-01-01 10:00:00", ""), "end_time"),
		];

		for (request, field) in cases {
			assert_eq!(request.validate(), Err(ValidationError::MissingField(field)));
		}
	}

	#[test]
	fn validate_rejects_other_time_formats() {
		let request = AccessCodeRequest::new("Carol", "2024-01-01T10:00:00", "2024-01-02 10:00:00");

		assert!(matches!(
			request.validate(),
			Err(ValidationError::InvalidTime { field: "start_time", .. })
		));
	}

	#[test]
	fn inverted_window_is_passed_through() {
		let request = AccessCodeRequest::new("Dave", "2024-01-02 10:00:00", "2024-01-01 10:00:00");

		assert!(request.validate().is_ok());
	}

	#[test]
	fn issued_code_serializes_untagged() {
		let code = IssuedCode::Shadow(ShadowPassword {
			password: "123456".into(),
			user_id: 150,
			name: "Erin".into(),
			start_time: "2024-01-01 10:00:00".into(),
			end_time: "2024-01-02 10:00:00".into(),
		});
		let value = serde_json::to_value(&code).expect("Issued code should serialize.");

		assert_eq!(value["user_id"], 150);
		assert_eq!(value["password"], "123456");
		assert_eq!(code.identifier(), "150");
		assert_eq!(code.holder_name(), "Erin");
	}
}
