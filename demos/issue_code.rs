//! Demonstrates issuing a shadow-property access code against a local mock of the vendor
//! cloud, using the default reqwest transport.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use lock_code_broker::{
	client::AuthClient,
	config::Credentials,
	http::ReqwestHttpClient,
	lock::{AccessCodeRequest, LockCommandIssuer, LockCommandStrategy},
	reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/token").query_param("grant_type", "1");
			then.status(200).header("content-type", "application/json").body(
				"{\"success\":true,\"result\":{\"access_token\":\"demo-access\",\"expire\":7200}}",
			);
		})
		.await;
	let shadow_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v2.0/cloud/thing/demo-device/shadow/properties/issue")
				.header("access_token", "demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"success\":true,\"result\":true}");
		})
		.await;
	let http_client = ReqwestHttpClient::with_builder(
		Client::builder().danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true),
		time::Duration::seconds(5),
	)?;
	let client = AuthClient::with_http_client(
		Credentials::new("demo-client", "demo-secret", "demo-device"),
		Url::parse(&server.base_url())?,
		http_client,
	);
	let issuer = LockCommandIssuer::new(
		Arc::new(client),
		"demo-device",
		LockCommandStrategy::ShadowProperty,
	);
	let code = issuer
		.issue_temporary_code(&AccessCodeRequest::new(
			"Guest",
			"2024-06-01 14:00:00",
			"2024-06-03 11:00:00",
		))
		.await?;

	println!(
		"Issued code {} for {} (slot {}).",
		code.password(),
		code.holder_name(),
		code.identifier()
	);

	token_mock.assert_async().await;
	shadow_mock.assert_async().await;

	Ok(())
}
