//! Coordinator-level error taxonomy shared by flows, stores, and introspection.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

const MESSAGE_CANCELLED: &str = "Sign-in was cancelled.";
const MESSAGE_NETWORK: &str = "Network error. Check your connection and try again.";
const MESSAGE_GENERIC: &str = "Sign-in failed. Please try again.";

/// Canonical error exposed by public APIs.
///
/// Variants split into two tiers: delegated-level failures ([`Error::ScopeInsufficient`],
/// [`Error::TokenRejected`]) only cost the API token, while [`Error::ReauthRequired`] is the
/// single identity-level failure that forces a full sign-out.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The user closed the consent UI.
	#[error("Sign-in was cancelled by the user.")]
	UserCancelled,
	/// The environment refused to open the consent pop-up.
	#[error("The sign-in pop-up was blocked.")]
	PopupBlocked,
	/// Network or upstream failure; safe to retry.
	#[error(transparent)]
	Network(#[from] TransportError),
	/// Introspection shows the delegated token lacks a required capability.
	#[error("Delegated token lacks the required scopes: {missing}.")]
	ScopeInsufficient {
		/// Space-delimited list of the scopes that were not granted.
		missing: String,
	},
	/// Introspection rejected the delegated token outright.
	#[error("Delegated token was rejected: {reason}.")]
	TokenRejected {
		/// Provider- or coordinator-supplied reason string.
		reason: String,
	},
	/// The identity session itself is stale and must be re-established.
	#[error("Identity session must be re-established: {reason}.")]
	ReauthRequired {
		/// Provider- or coordinator-supplied reason string.
		reason: String,
	},
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A sign-in flow is already running.
	#[error("Another sign-in is already in progress.")]
	SignInInProgress,
	/// Identity-provider failure that does not fit any other category.
	#[error("Identity provider failed with {code}: {message}.")]
	Provider {
		/// Raw provider error code.
		code: String,
		/// Raw provider message.
		message: String,
	},
}
impl Error {
	/// Friendly message for the three buckets the UI distinguishes.
	pub fn user_message(&self) -> &'static str {
		match self {
			Self::UserCancelled => MESSAGE_CANCELLED,
			Self::Network(_) => MESSAGE_NETWORK,
			_ => MESSAGE_GENERIC,
		}
	}

	/// Returns true when the caller may retry the same operation unchanged.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Network(_))
	}

	/// Returns true when the failure invalidates the identity session.
	pub fn is_identity_level(&self) -> bool {
		matches!(self, Self::ReauthRequired { .. })
	}

	/// Returns true when the failure only invalidates the delegated token.
	pub fn is_delegated_level(&self) -> bool {
		matches!(self, Self::ScopeInsufficient { .. } | Self::TokenRejected { .. })
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Descriptor validation failed.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::provider::AuthDescriptorError),
	/// Scopes cannot be normalized.
	#[error("Scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// The provider reported an unusable identity.
	#[error("Identity is invalid.")]
	InvalidIdentity(#[from] crate::auth::IdentifierError),
	/// Delegated token builder validation failed.
	#[error("Unable to build delegated token.")]
	TokenBuild(#[from] crate::auth::DelegatedTokenBuilderError),
	/// Tokeninfo returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Tokeninfo returned an `expires_in` that is not an integer.
	#[error("The expires_in value is not an integer: {raw}.")]
	InvalidExpiresIn {
		/// Raw value as returned upstream.
		raw: String,
	},
	/// Tokeninfo returned a non-positive lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level and upstream failures; always retryable.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client or provider SDK reported a network failure.
	#[error("Network error occurred while contacting the identity provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while contacting the identity provider.")]
	Io(#[from] std::io::Error),
	/// Upstream answered with a server-side failure.
	#[error("Upstream returned an unexpected response: {message}.")]
	Upstream {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Upstream answered with JSON that could not be parsed.
	#[error("Upstream returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Network failure described only by a message (e.g. from a provider SDK).
	pub fn network_message(message: impl Into<String>) -> Self {
		Self::Network { source: message.into().into() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn user_messages_cover_three_buckets() {
		assert_eq!(Error::UserCancelled.user_message(), MESSAGE_CANCELLED);
		assert_eq!(
			Error::from(TransportError::network_message("offline")).user_message(),
			MESSAGE_NETWORK
		);
		assert_eq!(Error::PopupBlocked.user_message(), MESSAGE_GENERIC);
		assert_eq!(
			Error::ReauthRequired { reason: "stale".into() }.user_message(),
			MESSAGE_GENERIC
		);
	}

	#[test]
	fn tiers_are_disjoint() {
		let network = Error::from(TransportError::network_message("offline"));
		let scope = Error::ScopeInsufficient { missing: "spreadsheets".into() };
		let reauth = Error::ReauthRequired { reason: "user-token-expired".into() };

		assert!(network.is_retryable());
		assert!(!network.is_identity_level() && !network.is_delegated_level());
		assert!(scope.is_delegated_level() && !scope.is_identity_level());
		assert!(reauth.is_identity_level() && !reauth.is_delegated_level());
	}

	#[test]
	fn store_error_is_exposed_as_source() {
		let store_error = StoreError::Backend { message: "quota exceeded".into() };
		let error: Error = store_error.clone().into();

		assert!(error.to_string().contains("quota exceeded"));

		let source = StdError::source(&error)
			.expect("Coordinator error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
