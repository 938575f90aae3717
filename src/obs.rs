//! Optional observability helpers for coordinator operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `delegated_auth.op` with the `op` and `stage` fields,
//!   plus warn-level events whenever a non-fatal failure is swallowed.
//! - Enable `metrics` to increment the `delegated_auth_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthOp {
	/// Interactive sign-in (pop-up or redirect).
	SignIn,
	/// Sign-out and local teardown.
	SignOut,
	/// Silent reuse of the identity session to mint a new delegated token.
	SilentRefresh,
	/// Boot-time pending-redirect check.
	RedirectCheck,
	/// Identity-provider restored-session notification.
	SessionRestore,
	/// Boot-time read of the persisted token.
	Restore,
	/// Token introspection call.
	Introspect,
}
impl AuthOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthOp::SignIn => "sign_in",
			AuthOp::SignOut => "sign_out",
			AuthOp::SilentRefresh => "silent_refresh",
			AuthOp::RedirectCheck => "redirect_check",
			AuthOp::SessionRestore => "session_restore",
			AuthOp::Restore => "restore",
			AuthOp::Introspect => "introspect",
		}
	}
}
impl Display for AuthOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller or degraded locally.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}

	/// Terminal outcome matching `result`.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure }
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
