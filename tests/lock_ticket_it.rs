// self
use lock_code_broker::{
	_preludet::*,
	error::{ProtocolError, ValidationError},
	lock::{AccessCodeRequest, IssuedCode, LockCommandStrategy, TicketPassword},
};

const TICKET_PATH: &str = "/v1.0/devices/device-test/door-lock/password-ticket";
const PASSWORD_PATH: &str = "/v1.0/devices/device-test/door-lock/temporary-password";

fn ticket_transport(
	ticket: serde_json::Value,
	password: serde_json::Value,
) -> Arc<ScriptedHttpClient> {
	Arc::new(
		ScriptedHttpClient::default()
			.route("/v1.0/token", [token_envelope("ticket-token", 7_200)])
			.route(TICKET_PATH, [ok_envelope(ticket)])
			.route(PASSWORD_PATH, [ok_envelope(password)]),
	)
}

fn alice() -> AccessCodeRequest {
	AccessCodeRequest::new("Alice", "2024-01-01 10:00:00", "2024-01-02 10:00:00")
}

#[tokio::test]
async fn ticket_strategy_issues_vendor_password() {
	let http = ticket_transport(
		serde_json::json!({ "ticket_id": "T1", "ticket_key": "unused", "expire_time": 300 }),
		serde_json::json!({ "id": "P1", "password": "123456" }),
	);
	let issuer = build_scripted_issuer(http.clone(), LockCommandStrategy::TicketPassword);
	let code =
		issuer.issue_temporary_code(&alice()).await.expect("Ticket issuance should succeed.");

	assert_eq!(
		code,
		IssuedCode::Ticket(TicketPassword {
			id: "P1".into(),
			password: "123456".into(),
			name: "Alice".into(),
			effective_time: "2024-01-01T10:00:00".into(),
			invalid_time: "2024-01-02T10:00:00".into(),
		})
	);

	let requests = http.requests();
	let ticket = requests
		.iter()
		.find(|req| req.path == TICKET_PATH)
		.expect("Ticket request should be recorded.");
	let password = requests
		.iter()
		.find(|req| req.path == PASSWORD_PATH)
		.expect("Temporary password request should be recorded.");
	let body: serde_json::Value =
		serde_json::from_str(&password.body).expect("Temporary password body should be JSON.");

	assert_eq!(ticket.body, "");
	assert_eq!(ticket.header("access_token"), Some("ticket-token"));
	assert_eq!(body["name"], "Alice");
	assert_eq!(body["password_type"], "temporary");
	assert_eq!(body["ticket_id"], "T1");
	assert_eq!(body["effective_time"], 1_704_103_200_i64);
	assert_eq!(body["invalid_time"], 1_704_189_600_i64);
}

#[tokio::test]
async fn ticket_strategy_applies_local_offset() {
	let http = ticket_transport(
		serde_json::json!({ "ticket_id": "T2" }),
		serde_json::json!({ "id": 42, "password": "654321" }),
	);
	let offset = UtcOffset::from_hms(8, 0, 0).expect("Offset fixture should be valid.");
	let issuer = build_scripted_issuer(http.clone(), LockCommandStrategy::TicketPassword)
		.with_local_offset(offset);
	let code =
		issuer.issue_temporary_code(&alice()).await.expect("Ticket issuance should succeed.");
	let IssuedCode::Ticket(code) = code else {
		panic!("Ticket strategy should report a ticket password.");
	};

	assert_eq!(code.id, "42");
	assert_eq!(code.effective_time, "2024-01-01T10:00:00");
	assert_eq!(code.invalid_time, "2024-01-02T10:00:00");

	let password = http
		.requests()
		.into_iter()
		.find(|req| req.path == PASSWORD_PATH)
		.expect("Temporary password request should be recorded.");
	let body: serde_json::Value =
		serde_json::from_str(&password.body).expect("Temporary password body should be JSON.");

	assert_eq!(body["effective_time"], 1_704_074_400_i64);
}

#[tokio::test]
async fn missing_ticket_id_stops_before_password_request() {
	let http = ticket_transport(
		serde_json::json!({ "expire_time": 300 }),
		serde_json::json!({ "id": "P1", "password": "123456" }),
	);
	let issuer = build_scripted_issuer(http.clone(), LockCommandStrategy::TicketPassword);
	let err = issuer.issue_temporary_code(&alice()).await.expect_err("Missing ticket should fail.");

	assert!(matches!(
		err,
		Error::Protocol(ProtocolError::MissingField { field: "ticket_id", .. })
	));
	assert_eq!(http.count(PASSWORD_PATH), 0);
}

#[tokio::test]
async fn password_response_without_password_is_a_protocol_failure() {
	let http = ticket_transport(
		serde_json::json!({ "ticket_id": "T3" }),
		serde_json::json!({ "id": "P3" }),
	);
	let issuer = build_scripted_issuer(http, LockCommandStrategy::TicketPassword);
	let err =
		issuer.issue_temporary_code(&alice()).await.expect_err("Missing password should fail.");

	assert!(matches!(
		err,
		Error::Protocol(ProtocolError::MissingField { field: "password", .. })
	));
}

#[tokio::test]
async fn invalid_input_never_reaches_the_vendor() {
	let http = ticket_transport(
		serde_json::json!({ "ticket_id": "T4" }),
		serde_json::json!({ "id": "P4", "password": "000000" }),
	);
	let issuer = build_scripted_issuer(http.clone(), LockCommandStrategy::TicketPassword);
	let err = issuer
		.issue_temporary_code(&AccessCodeRequest::new("Alice", "2024-01-01 10:00:00", "tomorrow"))
		.await
		.expect_err("Malformed end time should fail.");

	assert!(matches!(
		err,
		Error::Validation(ValidationError::InvalidTime { field: "end_time", .. })
	));
	assert!(http.requests().is_empty());
}
