//! Access-token record and the expiry-aware store that owns it.

// self
use crate::{_prelude::*, auth::Secret, error::ProtocolError};

/// Access token paired with the absolute instant it stops being accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
	/// Bearer value sent in the `access_token` header; callers must avoid logging it.
	pub value: Secret,
	/// Expiry instant derived from the grant time plus the vendor TTL.
	pub expires_at: OffsetDateTime,
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Holds at most one access token and decides when it must be refreshed.
///
/// The store is plain data; [`AuthClient`](crate::client::AuthClient) wraps it in a lock and
/// serializes refreshes so concurrent callers never observe a half-written token.
#[derive(Clone, Debug, Default)]
pub struct TokenStore {
	current: Option<AccessToken>,
}
impl TokenStore {
	/// Margin subtracted from the expiry so tokens are never used in their final minute.
	pub const SAFETY_MARGIN: Duration = Duration::seconds(60);
	/// Lifetime assumed when the vendor omits `expire`.
	pub const DEFAULT_TTL_SECS: i64 = 7_200;

	/// Returns `true` when a token is held and remains usable at the current instant.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` when a token is held and `now + SAFETY_MARGIN < expires_at`.
	pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
		self.current.as_ref().is_some_and(|token| now + Self::SAFETY_MARGIN < token.expires_at)
	}

	/// Returns the held token regardless of its freshness.
	pub fn current(&self) -> Option<&AccessToken> {
		self.current.as_ref()
	}

	/// Returns the held token only while it is usable at `now`.
	pub fn usable_at(&self, now: OffsetDateTime) -> Option<&AccessToken> {
		self.current.as_ref().filter(|_| self.is_valid_at(now))
	}

	/// Stores `value` with a lifetime of `ttl_secs` (default 7200) measured from now.
	pub fn replace(
		&mut self,
		value: impl Into<String>,
		ttl_secs: Option<i64>,
	) -> Result<&AccessToken, ProtocolError> {
		self.replace_at(value, ttl_secs, OffsetDateTime::now_utc())
	}

	/// Stores `value` with a lifetime of `ttl_secs` measured from `now`.
	pub fn replace_at(
		&mut self,
		value: impl Into<String>,
		ttl_secs: Option<i64>,
		now: OffsetDateTime,
	) -> Result<&AccessToken, ProtocolError> {
		let ttl = ttl_secs.unwrap_or(Self::DEFAULT_TTL_SECS);

		if ttl <= 0 {
			return Err(ProtocolError::NonPositiveExpiry(ttl));
		}

		let expires_at = now
			.checked_add(Duration::seconds(ttl))
			.ok_or(ProtocolError::ExpiryOutOfRange(ttl))?;
		let token = AccessToken { value: Secret::new(value), expires_at };

		Ok(&*self.current.insert(token))
	}

	/// Drops the held token so the next call refreshes.
	pub fn clear(&mut self) {
		self.current = None;
	}
}
