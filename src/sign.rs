//! HMAC-SHA256 request signing for the vendor cloud API.
//!
//! Every call carries a signature over
//! `client_id + access_token + t + METHOD + "\n" + sha256(body) + "\n" + "\n" + path`, where
//! the empty line is the (always empty) signed-headers block. The token grant itself is
//! signed with an empty access token.

// crates.io
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::Secret, error::ConfigError, http::HttpMethod};

type HmacSha256 = Hmac<Sha256>;

/// Value of the `sign_method` header.
pub const SIGN_METHOD: &str = "HMAC-SHA256";

/// Signature material computed for a single request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
	/// Uppercase hex HMAC-SHA256 of the canonical string.
	pub signature: String,
	/// Lowercase hex SHA-256 of the body.
	pub content_digest: String,
}

/// Fully signed request, built fresh for every call and never persisted.
#[derive(Clone, Debug)]
pub struct SignedRequest {
	/// HTTP method.
	pub method: HttpMethod,
	/// Path including the query string, exactly as signed.
	pub path: String,
	/// Body text fed to both the digest and the wire.
	pub body: String,
	/// Millisecond epoch timestamp sent as `t`.
	pub timestamp_ms: i64,
	/// Signature material.
	pub signature: Signature,
}
impl SignedRequest {
	/// Builds the vendor header set; `access_token` is omitted for the token grant.
	pub fn headers(
		&self,
		client_id: &str,
		access_token: Option<&Secret>,
	) -> Vec<(&'static str, String)> {
		let mut headers = vec![
			("client_id", client_id.to_owned()),
			("sign", self.signature.signature.clone()),
			("t", self.timestamp_ms.to_string()),
			("sign_method", SIGN_METHOD.to_owned()),
		];

		if let Some(token) = access_token.filter(|token| !token.is_empty()) {
			headers.push(("access_token", token.expose().to_owned()));
		}

		headers.push(("Content-Type", "application/json".to_owned()));

		headers
	}
}

/// Signs requests on behalf of one client identity.
#[derive(Clone, Debug)]
pub struct Signer {
	client_id: String,
	client_secret: Secret,
}
impl Signer {
	/// Creates a signer for the provided client identity.
	pub fn new(client_id: impl Into<String>, client_secret: Secret) -> Self {
		Self { client_id: client_id.into(), client_secret }
	}

	/// Client identifier bound to this signer.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Computes the signature and body digest for one request.
	pub fn sign(
		&self,
		access_token: &str,
		timestamp_ms: i64,
		method: HttpMethod,
		path: &str,
		body: &str,
	) -> Result<Signature> {
		let content_digest = content_digest(body);
		let canonical = format!(
			"{}{access_token}{timestamp_ms}{}\n{content_digest}\n\n{path}",
			self.client_id,
			method.as_str(),
		);
		let mut mac = <HmacSha256 as Mac>::new_from_slice(self.client_secret.expose().as_bytes())
			.map_err(|_| ConfigError::InvalidSigningKey)?;

		mac.update(canonical.as_bytes());

		let signature = hex::encode_upper(mac.finalize().into_bytes());

		Ok(Signature { signature, content_digest })
	}

	/// Signs a request stamped with the current wall clock.
	pub fn sign_now(
		&self,
		access_token: &str,
		method: HttpMethod,
		path: &str,
		body: String,
	) -> Result<SignedRequest> {
		let timestamp_ms = now_millis();
		let signature = self.sign(access_token, timestamp_ms, method, path, &body)?;

		Ok(SignedRequest { method, path: path.to_owned(), body, timestamp_ms, signature })
	}
}

/// Lowercase hex SHA-256 of `body`.
pub fn content_digest(body: &str) -> String {
	hex::encode(Sha256::digest(body.as_bytes()))
}

fn now_millis() -> i64 {
	let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();

	i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}
