//! Transport primitives for signed vendor calls.
//!
//! The module exposes [`VendorHttpClient`] alongside the plain [`VendorRequest`] and
//! [`VendorResponse`] values so downstream crates (and tests) can plug in their own HTTP
//! stack. The broker builds and signs the request; transports only move bytes and report
//! the HTTP status.

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`VendorHttpClient::execute`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<VendorResponse, TransportError>> + 'a + Send>>;

/// HTTP methods accepted by the vendor API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
	/// `GET`, used by the token grant.
	Get,
	/// `POST`, used by every device command.
	Post,
}
impl HttpMethod {
	/// Uppercase method name, as signed and sent.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully signed outbound request.
#[derive(Clone, Debug)]
pub struct VendorRequest {
	/// HTTP method.
	pub method: HttpMethod,
	/// Absolute URL (base URL plus signed path).
	pub url: Url,
	/// Path and query exactly as signed.
	pub path: String,
	/// Header pairs in send order.
	pub headers: Vec<(&'static str, String)>,
	/// Body text; empty for bodiless calls.
	pub body: String,
}
impl VendorRequest {
	/// Returns the first header value named `name`.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
	}
}

/// Raw response handed back by a transport.
#[derive(Clone, Debug)]
pub struct VendorResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl VendorResponse {
	/// Builds a response whose body is the JSON encoding of `value`.
	pub fn json(status: u16, value: &serde_json::Value) -> Self {
		Self { status, body: value.to_string().into_bytes() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Abstraction over HTTP transports capable of executing signed vendor calls.
///
/// Implementations must enforce a finite timeout and must not follow the vendor's error
/// semantics: any response with a status code is returned as-is, and only failures that
/// prevent a response (DNS, TLS, timeouts) surface as [`TransportError`].
pub trait VendorHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves with the raw response.
	fn execute(&self, request: VendorRequest) -> HttpFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// Vendor calls never follow redirects; configure any custom [`ReqwestClient`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that aborts every request after `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self, crate::error::ConfigError> {
		Self::with_builder(ReqwestClient::builder(), timeout)
	}

	/// Finishes a caller-tuned builder (TLS roots, proxies) with the vendor call policy:
	/// `timeout` on every request and no redirects.
	pub fn with_builder(
		builder: reqwest::ClientBuilder,
		timeout: Duration,
	) -> Result<Self, crate::error::ConfigError> {
		let timeout = std::time::Duration::try_from(timeout)
			.map_err(crate::error::ConfigError::http_client_build)?;
		let client =
			builder.timeout(timeout).redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl VendorHttpClient for ReqwestHttpClient {
	fn execute(&self, request: VendorRequest) -> HttpFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = match request.method {
				HttpMethod::Get => client.get(request.url),
				HttpMethod::Post => client.post(request.url).body(request.body),
			};

			for (name, value) in request.headers {
				builder = builder.header(name, value);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(VendorResponse { status, body })
		})
	}
}
