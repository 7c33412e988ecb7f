//! Shadow-property strategy writing lock users through DP 11.
//!
//! DP 11 carries a JSON document encoded as a string:
//! `{"op":"add","id":<slot>,"code":"<6 digits>","name":..,"validity":{..}}`. The broker
//! generates both the code and the user slot; slot collisions with codes already on the
//! device are not checked.

// std
use std::{collections::BTreeMap, ops::RangeInclusive};
// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	error::ProtocolError,
	http::{HttpMethod, VendorHttpClient},
	lock::{AccessCodeRequest, LockCommandIssuer, ValidatedWindow, iso},
};

/// Data point carrying lock user management commands.
pub const USER_DP: &str = "11";
/// Slots the broker draws user ids from.
pub const USER_ID_RANGE: RangeInclusive<u16> = 101..=200;

/// Access code written through the DP 11 shadow property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowPassword {
	/// Generated 6-digit code.
	pub password: String,
	/// Generated user slot.
	pub user_id: u16,
	/// Holder name.
	pub name: String,
	/// Caller-supplied start, echoed verbatim.
	pub start_time: String,
	/// Caller-supplied end, echoed verbatim.
	pub end_time: String,
}

#[derive(Serialize)]
struct UserCommand<'a> {
	op: &'static str,
	id: u16,
	code: &'a str,
	name: &'a str,
	validity: Validity,
}

#[derive(Serialize)]
struct Validity {
	start_time: String,
	end_time: String,
}

#[derive(Serialize)]
struct ShadowIssueBody {
	properties: BTreeMap<&'static str, String>,
}

impl<C> LockCommandIssuer<C>
where
	C: ?Sized + VendorHttpClient,
{
	pub(crate) async fn issue_shadow_password(
		&self,
		request: &AccessCodeRequest,
		window: ValidatedWindow,
	) -> Result<ShadowPassword> {
		let (password, user_id) = generate_code();
		let command = UserCommand {
			op: "add",
			id: user_id,
			code: &password,
			name: &request.holder_name,
			validity: Validity { start_time: iso(window.start), end_time: iso(window.end) },
		};
		let encoded = serde_json::to_string(&command)
			.map_err(|source| ProtocolError::Encode { context: "DP 11 command", source })?;
		let body = ShadowIssueBody { properties: BTreeMap::from([(USER_DP, encoded)]) };
		let path = format!("/v2.0/cloud/thing/{}/shadow/properties/issue", self.device_id);
		let result = self.client.call(HttpMethod::Post, &path, Some(&body)).await?;

		if result == serde_json::Value::Bool(false) {
			return Err(ProtocolError::CommandRejected { command: "shadow property issue" }.into());
		}

		Ok(ShadowPassword {
			password,
			user_id,
			name: request.holder_name.clone(),
			start_time: request.start_time.clone(),
			end_time: request.end_time.clone(),
		})
	}
}

/// Draws a zero-padded 6-digit code and a user slot from [`USER_ID_RANGE`].
fn generate_code() -> (String, u16) {
	let mut rng = rand::rng();
	let password = format!("{:06}", rng.random_range(0..1_000_000_u32));
	let user_id = rng.random_range(USER_ID_RANGE);

	(password, user_id)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn generated_codes_stay_in_bounds() {
		for _ in 0..500 {
			let (password, user_id) = generate_code();

			assert_eq!(password.len(), 6);
			assert!(password.bytes().all(|b| b.is_ascii_digit()));
			assert!(USER_ID_RANGE.contains(&user_id));
		}
	}

	#[test]
	fn user_command_serializes_in_vendor_order() {
		let command = UserCommand {
			op: "add",
			id: 101,
			code: "000123",
			name: "Frank",
			validity: Validity {
				start_time: "2024-01-01T10:00:00".into(),
				end_time: "2024-01-02T10:00:00".into(),
			},
		};
		let encoded = serde_json::to_string(&command).expect("Command should serialize.");

		assert_eq!(
			encoded,
			"{\"op\":\"add\",\"id\":101,\"code\":\"000123\",\"name\":\"Frank\",\
			 \"validity\":{\"start_time\":\"2024-01-01T10:00:00\",\"end_time\":\"2024-01-02T10:00:00\"}}"
		);
	}
}
