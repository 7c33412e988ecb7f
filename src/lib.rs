//! Signed-request broker for vendor IoT clouds: token lifecycle, HMAC request signing, and
//! time-bounded smart-lock access codes.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod lock;
pub mod obs;
#[cfg(feature = "server")] pub mod server;
pub mod sign;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use parking_lot::Mutex;
	// self
	use crate::{
		client::AuthClient,
		config::Credentials,
		error::TransportError,
		http::{HttpFuture, VendorHttpClient, VendorRequest, VendorResponse},
		lock::{LockCommandIssuer, LockCommandStrategy},
	};
	#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

	/// Client identifier shared by test fixtures.
	pub const TEST_CLIENT_ID: &str = "client-test";
	/// Client secret shared by test fixtures.
	pub const TEST_CLIENT_SECRET: &str = "secret-test";
	/// Device identifier shared by test fixtures.
	pub const TEST_DEVICE_ID: &str = "device-test";

	/// Credentials built from the fixture constants.
	pub fn test_credentials() -> Credentials {
		Credentials::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET, TEST_DEVICE_ID)
	}

	/// Successful vendor envelope wrapping `result`.
	pub fn ok_envelope(result: serde_json::Value) -> VendorResponse {
		VendorResponse::json(200, &serde_json::json!({ "success": true, "result": result }))
	}

	/// Failed vendor envelope carrying `code` and `msg`.
	pub fn err_envelope(code: i64, msg: &str) -> VendorResponse {
		let body = serde_json::json!({ "success": false, "code": code, "msg": msg });

		VendorResponse::json(200, &body)
	}

	/// Token grant envelope issuing `access_token` for `expire` seconds.
	pub fn token_envelope(access_token: &str, expire: i64) -> VendorResponse {
		ok_envelope(serde_json::json!({
			"access_token": access_token,
			"expire": expire,
			"refresh_token": "refresh-unused",
			"uid": "uid-test",
		}))
	}

	/// In-process transport that replays canned responses per path prefix and records every
	/// request it receives.
	///
	/// When a route runs out of responses its last response is repeated, which keeps
	/// "always fails" scenarios short to describe.
	#[derive(Debug, Default)]
	pub struct ScriptedHttpClient {
		routes: Mutex<Vec<(String, VecDeque<VendorResponse>, Option<VendorResponse>)>>,
		requests: Mutex<Vec<VendorRequest>>,
	}
	impl ScriptedHttpClient {
		/// Registers responses for requests whose path starts with `path_prefix`.
		pub fn route(
			self,
			path_prefix: impl Into<String>,
			responses: impl IntoIterator<Item = VendorResponse>,
		) -> Self {
			self.routes.lock().push((path_prefix.into(), responses.into_iter().collect(), None));

			self
		}

		/// Returns a snapshot of every request seen so far.
		pub fn requests(&self) -> Vec<VendorRequest> {
			self.requests.lock().clone()
		}

		/// Counts recorded requests whose path starts with `path_prefix`.
		pub fn count(&self, path_prefix: &str) -> usize {
			self.requests.lock().iter().filter(|req| req.path.starts_with(path_prefix)).count()
		}

		fn next_response(&self, path: &str) -> Option<VendorResponse> {
			let mut routes = self.routes.lock();
			let (_, queue, last) =
				routes.iter_mut().find(|(prefix, _, _)| path.starts_with(prefix.as_str()))?;

			match queue.pop_front() {
				Some(response) => {
					*last = Some(response.clone());

					Some(response)
				},
				None => last.clone(),
			}
		}
	}
	impl VendorHttpClient for ScriptedHttpClient {
		fn execute(&self, request: VendorRequest) -> HttpFuture<'_> {
			let response = self.next_response(&request.path);

			self.requests.lock().push(request.clone());

			Box::pin(async move {
				response.ok_or_else(|| TransportError::Status {
					status: 404,
					body_preview: format!("no scripted route for {}", request.path),
				})
			})
		}
	}

	/// Builds an [`AuthClient`] over the scripted transport.
	pub fn build_scripted_client(
		http_client: Arc<ScriptedHttpClient>,
	) -> AuthClient<ScriptedHttpClient> {
		let base_url =
			Url::parse("https://vendor.test").expect("Scripted base URL should always parse.");

		AuthClient::with_http_client(test_credentials(), base_url, http_client)
	}

	/// Builds a [`LockCommandIssuer`] over the scripted transport.
	pub fn build_scripted_issuer(
		http_client: Arc<ScriptedHttpClient>,
		strategy: LockCommandStrategy,
	) -> LockCommandIssuer<ScriptedHttpClient> {
		let client = Arc::new(build_scripted_client(http_client));

		LockCommandIssuer::new(client, TEST_DEVICE_ID, strategy)
	}

	/// Builds a reqwest transport that accepts the self-signed certificates served by
	/// `httpmock`, keeping the vendor call policy (timeout, no redirects).
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_http_client(timeout: Duration) -> ReqwestHttpClient {
		let builder = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true);

		ReqwestHttpClient::with_builder(builder, timeout)
			.expect("Failed to build insecure reqwest client for tests.")
	}

	/// Builds a reqwest-backed [`AuthClient`] pointed at `base_url` (usually an `httpmock`
	/// server) with a 5 second timeout.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_client(base_url: &str) -> AuthClient<ReqwestHttpClient> {
		build_reqwest_test_client_with_timeout(base_url, Duration::seconds(5))
	}

	/// Same as [`build_reqwest_test_client`] with a caller-chosen request timeout.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_client_with_timeout(
		base_url: &str,
		timeout: Duration,
	) -> AuthClient<ReqwestHttpClient> {
		let base_url = Url::parse(base_url).expect("Mock server base URL should parse.");
		let http_client = test_reqwest_http_client(timeout);

		AuthClient::with_http_client(test_credentials(), base_url, http_client)
	}
}

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(feature = "server")] use {color_eyre as _, dotenvy as _, tokio as _, tracing_subscriber as _};
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _, tower as _};
