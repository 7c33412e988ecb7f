// self
use lock_code_broker::{
	_preludet::*,
	error::{ProtocolError, ValidationError},
	http::HttpMethod,
	lock::{AccessCodeRequest, IssuedCode, LockCommandStrategy, shadow::USER_ID_RANGE},
};

const SHADOW_PATH: &str = "/v2.0/cloud/thing/device-test/shadow/properties/issue";

fn shadow_transport(result: serde_json::Value) -> Arc<ScriptedHttpClient> {
	Arc::new(
		ScriptedHttpClient::default()
			.route("/v1.0/token", [token_envelope("shadow-token", 7_200)])
			.route(SHADOW_PATH, [ok_envelope(result)]),
	)
}

#[tokio::test]
async fn shadow_strategy_writes_dp_11_user_command() {
	let http = shadow_transport(serde_json::Value::Bool(true));
	let issuer = build_scripted_issuer(http.clone(), LockCommandStrategy::ShadowProperty);
	let request = AccessCodeRequest::new("Grace", "2024-03-05 08:30:00", "2024-03-06 20:00:00");
	let code =
		issuer.issue_temporary_code(&request).await.expect("Shadow issuance should succeed.");
	let IssuedCode::Shadow(code) = code else {
		panic!("Shadow strategy should report a shadow password.");
	};

	assert_eq!(code.password.len(), 6);
	assert!(code.password.bytes().all(|b| b.is_ascii_digit()));
	assert!(USER_ID_RANGE.contains(&code.user_id));
	assert_eq!(code.name, "Grace");
	assert_eq!(code.start_time, "2024-03-05 08:30:00");
	assert_eq!(code.end_time, "2024-03-06 20:00:00");

	let issue = http
		.requests()
		.into_iter()
		.find(|req| req.path == SHADOW_PATH)
		.expect("Shadow request should be recorded.");

	assert_eq!(issue.method, HttpMethod::Post);
	assert_eq!(issue.header("access_token"), Some("shadow-token"));

	let body: serde_json::Value =
		serde_json::from_str(&issue.body).expect("Shadow body should be JSON.");
	let encoded = body["properties"]["11"].as_str().expect("DP 11 should carry a JSON string.");
	let command: serde_json::Value =
		serde_json::from_str(encoded).expect("DP 11 command should be JSON.");

	assert_eq!(command["op"], "add");
	assert_eq!(command["id"], code.user_id);
	assert_eq!(command["code"], code.password.as_str());
	assert_eq!(command["name"], "Grace");
	assert_eq!(command["validity"]["start_time"], "2024-03-05T08:30:00");
	assert_eq!(command["validity"]["end_time"], "2024-03-06T20:00:00");
}

#[tokio::test]
async fn rejected_shadow_command_is_a_protocol_failure() {
	let http = shadow_transport(serde_json::Value::Bool(false));
	let issuer = build_scripted_issuer(http, LockCommandStrategy::ShadowProperty);
	let err = issuer
		.issue_temporary_code(&AccessCodeRequest::new(
			"Heidi",
			"2024-03-05 08:30:00",
			"2024-03-06 20:00:00",
		))
		.await
		.expect_err("A false result should fail.");

	assert!(matches!(err, Error::Protocol(ProtocolError::CommandRejected { .. })));
}

#[tokio::test]
async fn vendor_failure_surfaces_code_and_message() {
	let http = Arc::new(
		ScriptedHttpClient::default()
			.route("/v1.0/token", [token_envelope("shadow-token", 7_200)])
			.route(SHADOW_PATH, [err_envelope(2_008, "command or value not support")]),
	);
	let issuer = build_scripted_issuer(http, LockCommandStrategy::ShadowProperty);
	let err = issuer
		.issue_temporary_code(&AccessCodeRequest::new(
			"Ivan",
			"2024-03-05 08:30:00",
			"2024-03-06 20:00:00",
		))
		.await
		.expect_err("Vendor failure should propagate.");

	assert!(matches!(err, Error::Vendor { code: 2_008, .. }));
	assert!(err.to_string().contains("command or value not support"));
}

#[tokio::test]
async fn missing_name_never_reaches_the_vendor() {
	let http = shadow_transport(serde_json::Value::Bool(true));
	let issuer = build_scripted_issuer(http.clone(), LockCommandStrategy::ShadowProperty);
	let request = AccessCodeRequest::new(" ", "2024-03-05 08:30:00", "2024-03-06 20:00:00");
	let err = issuer.issue_temporary_code(&request).await.expect_err("Blank name should fail.");

	assert!(matches!(err, Error::Validation(ValidationError::MissingField("name"))));
	assert!(err.is_validation());
	assert!(http.requests().is_empty());
}
