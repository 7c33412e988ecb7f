//! Ticket + temporary-password strategy.
//!
//! The device API first hands out a short-lived ticket, then accepts a temporary password
//! bound to that ticket with an epoch-second validity window.

// self
use crate::{
	_prelude::*,
	error::ProtocolError,
	http::{HttpMethod, VendorHttpClient},
	lock::{AccessCodeRequest, LockCommandIssuer, ValidatedWindow, iso},
};

/// Access code created through the temporary-password endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPassword {
	/// Vendor password identifier.
	pub id: String,
	/// Numeric code.
	pub password: String,
	/// Holder name.
	pub name: String,
	/// Start of validity, ISO-8601 in the configured local offset.
	pub effective_time: String,
	/// End of validity, ISO-8601 in the configured local offset.
	pub invalid_time: String,
}

#[derive(Deserialize)]
struct TicketResult {
	#[serde(default)]
	ticket_id: Option<String>,
}

#[derive(Serialize)]
struct TemporaryPasswordBody<'a> {
	name: &'a str,
	password_type: &'static str,
	effective_time: i64,
	invalid_time: i64,
	ticket_id: &'a str,
}

#[derive(Deserialize)]
struct TemporaryPasswordResult {
	#[serde(default)]
	id: Option<serde_json::Value>,
	#[serde(default)]
	password: Option<String>,
}

impl<C> LockCommandIssuer<C>
where
	C: ?Sized + VendorHttpClient,
{
	/// Requests a password ticket for the configured device.
	pub async fn request_ticket(&self) -> Result<String> {
		const CONTEXT: &str = "password ticket";

		let path = format!("/v1.0/devices/{}/door-lock/password-ticket", self.device_id);
		let ticket: TicketResult = self
			.client
			.call_as(HttpMethod::Post, &path, Some(&serde_json::json!({})), CONTEXT)
			.await?;

		ticket
			.ticket_id
			.filter(|id| !id.is_empty())
			.ok_or_else(|| {
				ProtocolError::MissingField { context: CONTEXT, field: "ticket_id" }.into()
			})
	}

	pub(crate) async fn issue_ticket_password(
		&self,
		request: &AccessCodeRequest,
		window: ValidatedWindow,
	) -> Result<TicketPassword> {
		const CONTEXT: &str = "temporary password";

		let ticket_id = self.request_ticket().await?;
		let effective_time = window.start.assume_offset(self.local_offset).unix_timestamp();
		let invalid_time = window.end.assume_offset(self.local_offset).unix_timestamp();
		let body = TemporaryPasswordBody {
			name: &request.holder_name,
			password_type: "temporary",
			effective_time,
			invalid_time,
			ticket_id: &ticket_id,
		};
		let path = format!("/v1.0/devices/{}/door-lock/temporary-password", self.device_id);
		let result: TemporaryPasswordResult =
			self.client.call_as(HttpMethod::Post, &path, Some(&body), CONTEXT).await?;
		let id = result
			.id
			.and_then(|id| match id {
				serde_json::Value::String(id) => Some(id),
				serde_json::Value::Number(id) => Some(id.to_string()),
				_ => None,
			})
			.ok_or(ProtocolError::MissingField { context: CONTEXT, field: "id" })?;
		let password = result
			.password
			.ok_or(ProtocolError::MissingField { context: CONTEXT, field: "password" })?;

		Ok(TicketPassword {
			id,
			password,
			name: request.holder_name.clone(),
			effective_time: iso(window.start),
			invalid_time: iso(window.end),
		})
	}
}
