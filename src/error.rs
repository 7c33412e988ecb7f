//! Broker-level error types shared by the signer, token store, client, and lock issuer.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem (fatal at startup).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Network or HTTP-layer failure; never retried by the broker.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Vendor response did not match the expected schema.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
	/// Caller input is missing or malformed.
	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// Access token acquisition failed.
	#[error("Token refresh failed: {source}")]
	Auth {
		/// Failure raised while requesting the token grant.
		#[source]
		source: Box<Error>,
	},
	/// Vendor reported a business failure.
	#[error("Vendor rejected the request: {message} (code: {code}).")]
	Vendor {
		/// Vendor error code, `0` when the vendor omitted it.
		code: i64,
		/// Vendor-supplied message.
		message: String,
	},
}
impl Error {
	/// Wraps a refresh failure inside [`Error::Auth`].
	pub fn auth(source: Error) -> Self {
		Self::Auth { source: Box::new(source) }
	}

	/// Returns `true` when the failure was caused by the caller's input.
	pub fn is_validation(&self) -> bool {
		matches!(self, Self::Validation(_))
	}
}

/// Configuration and startup failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required environment variable is absent or empty.
	#[error("Required environment variable `{name}` is not set.")]
	MissingVariable {
		/// Variable name.
		name: &'static str,
	},
	/// An environment variable holds a value that cannot be parsed.
	#[error("Environment variable `{name}` has an invalid value: {reason}.")]
	InvalidVariable {
		/// Variable name.
		name: &'static str,
		/// Parser-supplied reason.
		reason: String,
	},
	/// Base URL cannot be parsed or joined with a request path.
	#[error("Vendor URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Client secret cannot key the HMAC.
	#[error("Client secret cannot be used as an HMAC key.")]
	InvalidSigningKey,
	/// Strategy label is not recognized.
	#[error("Unknown lock strategy `{0}`; expected `ticket` or `shadow`.")]
	UnknownStrategy(String),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, timeouts, non-2xx statuses).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the vendor API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the configured timeout.
	#[error("Vendor API call timed out.")]
	Timeout,
	/// Vendor answered with a non-2xx HTTP status.
	#[error("Vendor API returned HTTP {status}: {body_preview}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Leading part of the response body.
		body_preview: String,
	},
}
impl TransportError {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Builds a [`TransportError::Status`] with a bounded preview of `body`.
	pub fn status(status: u16, body: &[u8]) -> Self {
		let text = String::from_utf8_lossy(body);
		let body_preview = text.chars().take(Self::BODY_PREVIEW_LIMIT).collect();

		Self::Status { status, body_preview }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Vendor responses whose shape does not match the expected schema.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
	/// Body is not a valid vendor envelope or result payload.
	#[error("Vendor returned malformed JSON for {context}.")]
	Malformed {
		/// Call being decoded.
		context: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Request payload could not be encoded as JSON.
	#[error("Failed to encode {context} as JSON.")]
	Encode {
		/// Payload being encoded.
		context: &'static str,
		/// Encoder failure.
		#[source]
		source: serde_json::Error,
	},
	/// A required field is absent from an otherwise successful response.
	#[error("Vendor response for {context} is missing `{field}`.")]
	MissingField {
		/// Call being decoded.
		context: &'static str,
		/// Absent field name.
		field: &'static str,
	},
	/// Token grant carried a non-positive lifetime.
	#[error("Token grant returned a non-positive expire value ({0}).")]
	NonPositiveExpiry(i64),
	/// Device command was not acknowledged.
	#[error("Device rejected the {command} command.")]
	CommandRejected {
		/// Command label.
		command: &'static str,
	},
	/// Token grant lifetime pushes the expiry past the representable range.
	#[error("Token grant expire value ({0}) is out of range.")]
	ExpiryOutOfRange(i64),
}

/// Caller input failures, surfaced as client errors by the route layer.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// A required field is absent or empty.
	#[error("Field `{0}` is required.")]
	MissingField(&'static str),
	/// A time field does not follow `YYYY-MM-DD HH:MM:SS`.
	#[error("Field `{field}` must use the YYYY-MM-DD HH:MM:SS format (got `{value}`).")]
	InvalidTime {
		/// Field name.
		field: &'static str,
		/// Rejected value.
		value: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn auth_error_exposes_cause_as_source() {
		let cause = Error::Vendor { code: 1004, message: "sign invalid".into() };
		let err = Error::auth(cause);
		let source = StdError::source(&err).expect("Auth error should expose its cause.");

		assert!(err.to_string().contains("sign invalid"));
		assert!(source.to_string().contains("1004"));
	}

	#[test]
	fn status_preview_is_bounded() {
		let body = vec![b'x'; 1024];

		match TransportError::status(502, &body) {
			TransportError::Status { status, body_preview } => {
				assert_eq!(status, 502);
				assert_eq!(body_preview.len(), TransportError::BODY_PREVIEW_LIMIT);
			},
			other => panic!("Unexpected transport error: {other:?}."),
		}
	}

	#[test]
	fn only_validation_errors_are_flagged() {
		assert!(Error::from(ValidationError::MissingField("name")).is_validation());
		assert!(!Error::from(TransportError::Timeout).is_validation());
	}
}
