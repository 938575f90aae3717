//! Validated coordinator configuration.

/// Builder API for assembling descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	schedule::{MIN_DELAY, REFRESH_BUFFER},
};

/// Google's public token introspection endpoint.
pub const GOOGLE_TOKENINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/tokeninfo";
/// Scope granting read/write access to spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
/// Lifetime assumed when neither the provider nor introspection reports one.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::hours(1);

/// Immutable coordinator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthDescriptor {
	/// Introspection endpoint used to learn a token's real lifetime and scopes.
	pub tokeninfo_endpoint: Option<Url>,
	/// Capabilities the delegated token must carry.
	pub required_scopes: ScopeSet,
	/// How long before expiry a token counts as expiring.
	pub refresh_buffer: Duration,
	/// Shortest delay the expiry timer is armed for.
	pub min_timer_delay: Duration,
	/// Lifetime assumed when none is reported.
	pub default_lifetime: Duration,
}
impl AuthDescriptor {
	/// Creates a new builder seeded with the defaults.
	pub fn builder() -> AuthDescriptorBuilder {
		AuthDescriptorBuilder::new()
	}
}
impl Default for AuthDescriptor {
	fn default() -> Self {
		Self {
			tokeninfo_endpoint: None,
			required_scopes: ScopeSet::default(),
			refresh_buffer: REFRESH_BUFFER,
			min_timer_delay: MIN_DELAY,
			default_lifetime: DEFAULT_TOKEN_LIFETIME,
		}
	}
}
