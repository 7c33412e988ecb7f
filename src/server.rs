//! HTTP route layer exposing access code issuance (feature `server`).
//!
//! - `POST /v1/passwords/temporary` with `{"name", "start_time", "end_time"}` answers `201`
//!   with `{"success": true, "data": <IssuedCode>}`.
//! - Missing fields or malformed JSON answer `400`; every other failure answers `500`. Both
//!   carry `{"success": false, "error": <message>}`.
//! - `GET /health` answers `200 {"status": "ok"}`.

// crates.io
use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	error::ValidationError,
	http::VendorHttpClient,
	lock::{AccessCodeRequest, LockCommandIssuer},
};

/// Path of the access code endpoint.
pub const ISSUE_CODE_PATH: &str = "/v1/passwords/temporary";
/// Path of the liveness check.
pub const HEALTH_PATH: &str = "/health";

/// Inbound JSON body; every field is optional here so absence maps to a validation error.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IssueCodeBody {
	/// Holder name.
	#[serde(default)]
	pub name: Option<String>,
	/// Window start (`YYYY-MM-DD HH:MM:SS`).
	#[serde(default)]
	pub start_time: Option<String>,
	/// Window end (`YYYY-MM-DD HH:MM:SS`).
	#[serde(default)]
	pub end_time: Option<String>,
}
impl IssueCodeBody {
	/// Converts the body into an [`AccessCodeRequest`], rejecting absent fields.
	pub fn into_request(self) -> Result<AccessCodeRequest, ValidationError> {
		let name = self.name.ok_or(ValidationError::MissingField("name"))?;
		let start_time = self.start_time.ok_or(ValidationError::MissingField("start_time"))?;
		let end_time = self.end_time.ok_or(ValidationError::MissingField("end_time"))?;

		Ok(AccessCodeRequest::new(name, start_time, end_time))
	}
}

/// Broker error rendered as a JSON failure response.
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	message: String,
}
impl From<Error> for ApiError {
	fn from(e: Error) -> Self {
		let status = if e.is_validation() {
			StatusCode::BAD_REQUEST
		} else {
			StatusCode::INTERNAL_SERVER_ERROR
		};

		Self { status, message: e.to_string() }
	}
}
impl From<ValidationError> for ApiError {
	fn from(e: ValidationError) -> Self {
		Error::from(e).into()
	}
}
impl From<JsonRejection> for ApiError {
	fn from(e: JsonRejection) -> Self {
		Self { status: StatusCode::BAD_REQUEST, message: e.body_text() }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(json!({ "success": false, "error": self.message }))).into_response()
	}
}

/// Builds the router serving the access code endpoint and the health check.
pub fn router<C>(issuer: Arc<LockCommandIssuer<C>>) -> Router
where
	C: ?Sized + VendorHttpClient,
{
	Router::new()
		.route(ISSUE_CODE_PATH, post(issue_code::<C>))
		.route(HEALTH_PATH, get(health))
		.with_state(issuer)
}

async fn issue_code<C>(
	State(issuer): State<Arc<LockCommandIssuer<C>>>,
	payload: Result<Json<IssueCodeBody>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError>
where
	C: ?Sized + VendorHttpClient,
{
	let Json(body) = payload?;
	let request = body.into_request()?;

	match issuer.issue_temporary_code(&request).await {
		Ok(code) => {
			tracing::info!(holder = %code.holder_name(), "access code issued");

			Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": code }))))
		},
		Err(e) => {
			tracing::error!(error = %e, "access code issuance failed");

			Err(e.into())
		},
	}
}

async fn health() -> Json<serde_json::Value> {
	Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn absent_fields_are_reported_in_order() {
		let body = IssueCodeBody { name: Some("Alice".into()), ..Default::default() };

		assert_eq!(body.into_request(), Err(ValidationError::MissingField("start_time")));
		assert_eq!(
			IssueCodeBody::default().into_request(),
			Err(ValidationError::MissingField("name"))
		);
	}

	#[test]
	fn status_follows_error_class() {
		let validation = ApiError::from(ValidationError::MissingField("name"));
		let vendor = ApiError::from(Error::Vendor { code: 2001, message: "device offline".into() });

		assert_eq!(validation.status, StatusCode::BAD_REQUEST);
		assert_eq!(vendor.status, StatusCode::INTERNAL_SERVER_ERROR);
		assert!(vendor.message.contains("device offline"));
	}
}
