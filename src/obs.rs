//! Instrumentation for the three vendor-facing operations: the token grant, signed business
//! calls, and access code issuance.
//!
//! Each operation opens a `lock_code_broker.call` span whose `stage` names where it ran
//! (`refresh`, `call`, or the lock strategy label `ticket` / `shadow`) and bumps the
//! `lock_code_broker_call_total{call, outcome}` counter. A business call that hits the
//! expired-token code records one extra `retry` before its terminal outcome, so
//! `retry / attempt` on `vendor_call` tracks how often cached tokens go stale early.
//!
//! Spans need the `tracing` feature and counters the `metrics` feature; without them every
//! helper compiles to a no-op.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Vendor-facing operation being observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// `GET /v1.0/token?grant_type=1`.
	TokenGrant,
	/// Any signed call made with a cached access token.
	VendorCall,
	/// Validation plus the strategy's device commands.
	IssueCode,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::TokenGrant => "token_grant",
			CallKind::VendorCall => "vendor_call",
			CallKind::IssueCode => "issue_code",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Counter label for one step of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Operation entered.
	Attempt,
	/// Vendor answered with the expired-token code and the call is replayed.
	Retry,
	/// Operation returned `Ok`.
	Success,
	/// Operation returned `Err`.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Retry => "retry",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Counts `result` as the terminal `success` or `failure` of `kind`.
pub fn record_result<T>(kind: CallKind, result: &Result<T>) {
	match result {
		Ok(_) => record_call_outcome(kind, CallOutcome::Success),
		Err(_) => record_call_outcome(kind, CallOutcome::Failure),
	}
}
