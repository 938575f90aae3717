//! Sign-in flow controller.
//!
//! [`SignInFlow`] drives the provider through one of two interaction modes and normalizes
//! whatever comes back into an [`AcquiredSession`]. Pop-up results arrive in-process; redirect
//! results arrive on the next page load through [`SignInFlow::pending_redirect`]. The flow
//! never stores tokens itself; the coordinator ingests every [`AcquiredSession`] through one
//! path regardless of which mode produced it.

pub mod sign_in;

pub use sign_in::*;

// self
use crate::{
	_prelude::*,
	auth::{DelegatedToken, Identity},
};

/// Interaction mode used to collect consent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowMode {
	/// In-page consent window; completes in-process.
	Popup,
	/// Full-page navigation; completes on the next load.
	Redirect,
}

/// Host capability probe choosing the preferred [`FlowMode`] per attempt.
pub type FlowCapability = Arc<dyn Fn() -> FlowMode + Send + Sync>;

/// Capability that always prefers the pop-up flow.
pub fn prefer_popup() -> FlowCapability {
	Arc::new(|| FlowMode::Popup)
}

/// Capability that always uses the redirect flow (e.g. mobile or embedded browsers).
pub fn redirect_only() -> FlowCapability {
	Arc::new(|| FlowMode::Redirect)
}

/// Normalized result of a completed consent.
#[derive(Clone, Debug)]
pub struct AcquiredSession {
	/// Signed-in user.
	pub identity: Identity,
	/// Delegated token with an absolute expiry.
	pub token: DelegatedToken,
}

/// Outcome of [`SignInFlow::run`].
#[derive(Clone, Debug)]
pub enum FlowResult {
	/// Consent completed in-process.
	Completed(AcquiredSession),
	/// The host is navigating away; the result surfaces on the next load.
	Redirecting,
}
