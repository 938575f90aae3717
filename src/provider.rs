//! Identity-provider surface consumed by the coordinator.
//!
//! `descriptor` holds validated configuration ([`AuthDescriptor`]); `strategy` maps raw SDK
//! failures into the crate's error taxonomy. [`IdentityProvider`] is the seam to the
//! provider SDK itself: pop-up and redirect consent, the per-load pending-redirect check,
//! silent reuse of a live session, and sign-out.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;

// self
use crate::{
	_prelude::*,
	auth::{Identity, ScopeSet, TokenSecret},
};

/// Boxed future returned by [`IdentityProvider`] operations.
pub type ProviderFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ProviderError>> + 'a + Send>>;

/// Raw failure reported by the provider SDK, before classification.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{code}: {message}")]
pub struct ProviderError {
	/// SDK error code (e.g. `auth/popup-blocked`).
	pub code: String,
	/// SDK message.
	pub message: String,
}
impl ProviderError {
	/// Creates a provider error from its code and message.
	pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { code: code.into(), message: message.into() }
	}
}

/// Delegated credential extracted from a completed consent or silent renewal.
#[derive(Clone, Debug)]
pub struct ProviderCredential {
	/// Bearer value for the spreadsheet API.
	pub access_token: TokenSecret,
	/// Lifetime reported alongside the credential, if any.
	pub expires_in: Option<Duration>,
	/// Scopes reported alongside the credential, if any.
	pub scopes: Option<ScopeSet>,
}
impl ProviderCredential {
	/// Creates a credential with no lifetime or scope information.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self { access_token: TokenSecret::new(access_token), expires_in: None, scopes: None }
	}

	/// Attaches the reported lifetime.
	pub fn with_expires_in(mut self, lifetime: Duration) -> Self {
		self.expires_in = Some(lifetime);

		self
	}

	/// Attaches the reported scopes.
	pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = Some(scopes);

		self
	}
}

/// Result of a completed consent: who signed in and what they delegated.
#[derive(Clone, Debug)]
pub struct ProviderSignIn {
	/// Signed-in user.
	pub identity: Identity,
	/// Delegated credential for the spreadsheet API.
	pub credential: ProviderCredential,
}

/// Identity-provider SDK operations the coordinator drives.
pub trait IdentityProvider
where
	Self: Send + Sync,
{
	/// Opens an interactive consent window and completes in-process.
	fn sign_in_with_popup<'a>(&'a self, scopes: &'a ScopeSet) -> ProviderFuture<'a, ProviderSignIn>;

	/// Navigates away to the provider; the result surfaces on the next page load.
	fn sign_in_with_redirect<'a>(&'a self, scopes: &'a ScopeSet) -> ProviderFuture<'a, ()>;

	/// Returns the result of a redirect sign-in started on a previous load, if any.
	fn pending_redirect_result(&self) -> ProviderFuture<'_, Option<ProviderSignIn>>;

	/// Mints a new delegated credential from the live session without any UI.
	///
	/// `Ok(None)` means there is no session that can be reused silently.
	fn silent_credential<'a>(
		&'a self,
		scopes: &'a ScopeSet,
	) -> ProviderFuture<'a, Option<ProviderCredential>>;

	/// Ends the provider session.
	fn sign_out(&self) -> ProviderFuture<'_, ()>;
}
