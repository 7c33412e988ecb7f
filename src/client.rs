//! Authenticated request pipeline: token lifecycle, signing, and the single retry on an
//! expired token.
//!
//! [`AuthClient::call`] checks the cached token, refreshes it when it is missing or within
//! the safety margin, signs the request, and decodes the vendor envelope. A vendor code of
//! [`TOKEN_INVALID_CODE`] on the first attempt drops the rejected token and replays the call
//! exactly once. Refreshes run behind a singleflight gate so concurrent callers racing on an
//! expired token trigger a single token grant.

// self
use crate::{
	_prelude::*,
	auth::{Secret, TokenStore},
	config::Credentials,
	error::{ConfigError, ProtocolError, TransportError},
	http::{HttpMethod, VendorHttpClient, VendorRequest, VendorResponse},
	obs::{self, CallKind, CallOutcome, CallSpan},
	sign::Signer,
};
#[cfg(feature = "reqwest")] use crate::{config::Config, http::ReqwestHttpClient};

/// Vendor code reporting an invalid or expired access token.
pub const TOKEN_INVALID_CODE: i64 = 1010;
/// Path of the token grant, signed with an empty access token.
pub const TOKEN_PATH: &str = "/v1.0/token?grant_type=1";

const MAX_TOKEN_RETRIES: u8 = 1;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthClient = AuthClient<ReqwestHttpClient>;

/// Envelope wrapping every vendor response.
#[derive(Clone, Debug, Deserialize)]
struct Envelope {
	success: bool,
	#[serde(default)]
	code: Option<i64>,
	#[serde(default)]
	msg: Option<String>,
	#[serde(default)]
	result: Option<serde_json::Value>,
}

/// Result payload of the token grant.
#[derive(Clone, Deserialize)]
struct TokenGrant {
	access_token: String,
	#[serde(default)]
	expire: Option<i64>,
}

/// Signs and sends vendor calls on behalf of one client identity.
///
/// The client owns its [`TokenStore`]; share it behind an `Arc` rather than cloning so every
/// caller observes the same token.
pub struct AuthClient<C>
where
	C: ?Sized + VendorHttpClient,
{
	/// HTTP client wrapper used for every outbound vendor request.
	pub http_client: Arc<C>,
	/// Region-specific vendor endpoint.
	pub base_url: Url,
	signer: Signer,
	tokens: RwLock<TokenStore>,
	refresh_gate: AsyncMutex<()>,
}
impl<C> AuthClient<C>
where
	C: ?Sized + VendorHttpClient,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		credentials: Credentials,
		base_url: Url,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			base_url,
			signer: Signer::new(credentials.client_id, credentials.client_secret),
			tokens: Default::default(),
			refresh_gate: AsyncMutex::new(()),
		}
	}

	/// Client identifier used for signing.
	pub fn client_id(&self) -> &str {
		self.signer.client_id()
	}

	/// Returns a snapshot of the token store.
	pub fn token_store(&self) -> TokenStore {
		self.tokens.read().clone()
	}

	/// Performs a signed call and returns the vendor `result` payload (`null` when absent).
	///
	/// `body` is serialized once and the same bytes are digested and sent on every attempt.
	/// An empty JSON object is sent as an empty body.
	pub async fn call<B>(
		&self,
		method: HttpMethod,
		path: &str,
		body: Option<&B>,
	) -> Result<serde_json::Value>
	where
		B: ?Sized + Serialize,
	{
		const KIND: CallKind = CallKind::VendorCall;

		let body = canonical_body(body)?;
		let span = CallSpan::new(KIND, "call");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.call_with_retry(method, path, body)).await;

		obs::record_result(KIND, &result);

		result
	}

	/// Performs a signed call and decodes the `result` payload into `T`.
	pub async fn call_as<T, B>(
		&self,
		method: HttpMethod,
		path: &str,
		body: Option<&B>,
		context: &'static str,
	) -> Result<T>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let value = self.call(method, path, body).await?;

		decode(value, context)
	}

	/// Discards the cached token and fetches a new one under the singleflight gate.
	pub async fn force_refresh(&self) -> Result<()> {
		let _gate = self.refresh_gate.lock().await;

		self.refresh_locked().await.map(|_| ())
	}

	async fn call_with_retry(
		&self,
		method: HttpMethod,
		path: &str,
		body: String,
	) -> Result<serde_json::Value> {
		let mut retries = 0;

		loop {
			let token = self.access_token().await?;
			let envelope = self.send(method, path, body.clone(), Some(&token)).await?;

			if envelope.success {
				return Ok(envelope.result.unwrap_or(serde_json::Value::Null));
			}

			let code = envelope.code.unwrap_or_default();

			if code == TOKEN_INVALID_CODE && retries < MAX_TOKEN_RETRIES {
				retries += 1;

				obs::record_call_outcome(CallKind::VendorCall, CallOutcome::Retry);
				#[cfg(feature = "tracing")]
				tracing::warn!(path, code, "vendor rejected the access token; refreshing once");

				self.invalidate(&token);

				continue;
			}

			return Err(Error::Vendor { code, message: envelope.msg.unwrap_or_default() });
		}
	}

	/// Returns a usable token, refreshing it when missing or about to expire.
	async fn access_token(&self) -> Result<Secret> {
		if let Some(token) = self.usable_token() {
			return Ok(token);
		}

		let _gate = self.refresh_gate.lock().await;

		// Another caller may have refreshed while this one waited on the gate.
		if let Some(token) = self.usable_token() {
			return Ok(token);
		}

		self.refresh_locked().await
	}

	fn usable_token(&self) -> Option<Secret> {
		self.tokens.read().usable_at(OffsetDateTime::now_utc()).map(|token| token.value.clone())
	}

	/// Clears the store only if it still holds the rejected token.
	fn invalidate(&self, rejected: &Secret) {
		let mut tokens = self.tokens.write();

		if tokens.current().is_some_and(|token| &token.value == rejected) {
			tokens.clear();
		}
	}

	/// Runs the token grant; callers must hold `refresh_gate`.
	async fn refresh_locked(&self) -> Result<Secret> {
		const KIND: CallKind = CallKind::TokenGrant;

		let span = CallSpan::new(KIND, "refresh");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async {
				let envelope = self.send(HttpMethod::Get, TOKEN_PATH, String::new(), None).await?;

				if !envelope.success {
					return Err(Error::Vendor {
						code: envelope.code.unwrap_or_default(),
						message: envelope.msg.unwrap_or_default(),
					});
				}

				let grant: TokenGrant = decode(
					envelope.result.ok_or(ProtocolError::MissingField {
						context: "token grant",
						field: "result",
					})?,
					"token grant",
				)?;
				let value = {
					let mut tokens = self.tokens.write();

					tokens.replace(grant.access_token, grant.expire)?.value.clone()
				};

				Ok(value)
			})
			.await
			.map_err(Error::auth);

		obs::record_result(KIND, &result);

		result
	}

	/// Signs, sends, and decodes one request; `access_token` is `None` for the token grant.
	async fn send(
		&self,
		method: HttpMethod,
		path: &str,
		body: String,
		access_token: Option<&Secret>,
	) -> Result<Envelope> {
		let token_value = access_token.map(Secret::expose).unwrap_or_default();
		let signed = self.signer.sign_now(token_value, method, path, body)?;
		let url = self.url_for(path)?;
		let request = VendorRequest {
			method,
			url,
			path: path.to_owned(),
			headers: signed.headers(self.signer.client_id(), access_token),
			body: signed.body,
		};

		#[cfg(feature = "tracing")]
		tracing::debug!(%method, path, "sending vendor request");

		let response = self.http_client.execute(request).await?;

		parse_envelope(response)
	}

	fn url_for(&self, path: &str) -> Result<Url> {
		let base = self.base_url.as_str().trim_end_matches('/');

		Url::parse(&format!("{base}{path}"))
			.map_err(|source| ConfigError::InvalidUrl { source }.into())
	}
}
#[cfg(feature = "reqwest")]
impl AuthClient<ReqwestHttpClient> {
	/// Builds a reqwest-backed client from validated configuration.
	pub fn from_config(config: &Config) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout)?;

		Ok(Self::with_http_client(
			config.credentials.clone(),
			config.api_base_url.clone(),
			http_client,
		))
	}
}
impl<C> Debug for AuthClient<C>
where
	C: ?Sized + VendorHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClient")
			.field("base_url", &self.base_url.as_str())
			.field("token_valid", &self.tokens.read().is_valid())
			.finish()
	}
}

/// Serializes `body` to canonical JSON text; `None` and `{}` become the empty string.
pub fn canonical_body<B>(body: Option<&B>) -> Result<String>
where
	B: ?Sized + Serialize,
{
	let Some(body) = body else {
		return Ok(String::new());
	};
	let value = serde_json::to_value(body).map_err(|e| malformed("request body", e))?;

	if value.as_object().is_some_and(|map| map.is_empty()) {
		return Ok(String::new());
	}

	serde_json::to_string(body).map_err(|e| malformed("request body", e))
}

fn parse_envelope(response: VendorResponse) -> Result<Envelope> {
	if !response.is_success() {
		return Err(TransportError::status(response.status, &response.body).into());
	}

	let mut de = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| ProtocolError::Malformed { context: "vendor envelope", source }.into())
}

fn decode<T>(value: serde_json::Value, context: &'static str) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value)
		.map_err(|source| ProtocolError::Malformed { context, source }.into())
}

fn malformed(context: &'static str, source: serde_json::Error) -> Error {
	ProtocolError::Encode { context, source }.into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_object_and_none_serialize_to_empty_body() {
		assert_eq!(canonical_body::<serde_json::Value>(None).expect("None should serialize."), "");
		assert_eq!(
			canonical_body(Some(&serde_json::json!({}))).expect("Empty object should serialize."),
			""
		);
		assert_eq!(
			canonical_body(Some(&serde_json::json!({ "a": 1 }))).expect("Object should serialize."),
			"{\"a\":1}"
		);
	}

	#[test]
	fn non_2xx_status_is_a_transport_error() {
		let err = parse_envelope(VendorResponse { status: 503, body: b"busy".to_vec() })
			.expect_err("503 should fail.");

		assert!(matches!(err, Error::Transport(TransportError::Status { status: 503, .. })));
	}

	#[test]
	fn envelope_without_success_flag_is_a_protocol_error() {
		let err = parse_envelope(VendorResponse { status: 200, body: b"{\"result\":{}}".to_vec() })
			.expect_err("Missing success flag should fail.");

		assert!(matches!(err, Error::Protocol(ProtocolError::Malformed { .. })));
	}
}
