//! Classification of raw provider SDK failures.
//!
//! Implementations only see the crate-owned [`ProviderError`] so they stay independent of
//! whichever SDK binding produced it.

// self
use crate::{_prelude::*, error::TransportError, provider::ProviderError};

/// Strategy hook that maps provider failures into the error taxonomy.
pub trait ProviderStrategy: Send + Sync {
	/// Buckets a provider failure.
	fn classify(&self, error: &ProviderError) -> ProviderErrorKind;

	/// Converts a provider failure into a crate [`Error`] using [`classify`](Self::classify).
	fn to_error(&self, error: ProviderError) -> Error {
		self.classify(&error).into_error(error)
	}
}

/// Canonical provider error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// User dismissed the consent UI.
	UserCancelled,
	/// The consent pop-up could not be opened.
	PopupBlocked,
	/// Connectivity problem; retryable.
	Network,
	/// The identity session is stale or revoked.
	ReauthRequired,
	/// Consent did not grant the requested capability.
	ScopeInsufficient,
	/// Anything else.
	Other,
}
impl ProviderErrorKind {
	/// Builds the matching [`Error`] for `source`.
	pub fn into_error(self, source: ProviderError) -> Error {
		match self {
			Self::UserCancelled => Error::UserCancelled,
			Self::PopupBlocked => Error::PopupBlocked,
			Self::Network => TransportError::network(source).into(),
			Self::ReauthRequired => Error::ReauthRequired { reason: source.code },
			Self::ScopeInsufficient => Error::ScopeInsufficient { missing: source.message },
			Self::Other => Error::Provider { code: source.code, message: source.message },
		}
	}
}

/// Understands the codes emitted by common browser identity SDKs.
///
/// Codes are compared case-insensitively with an optional `auth/` prefix. When the code is
/// unknown the message is searched for the same hints; otherwise the failure is
/// [`ProviderErrorKind::Other`].
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify(&self, error: &ProviderError) -> ProviderErrorKind {
		let code = error.code.trim().to_ascii_lowercase();
		let code = code.strip_prefix("auth/").unwrap_or(&code);

		match_code(code).or_else(|| classify_message(&error.message)).unwrap_or(ProviderErrorKind::Other)
	}
}

fn match_code(code: &str) -> Option<ProviderErrorKind> {
	match code {
		"popup-closed-by-user" | "cancelled-popup-request" | "user-cancelled"
		| "access_denied" => Some(ProviderErrorKind::UserCancelled),
		"popup-blocked" | "operation-not-supported-in-this-environment" =>
			Some(ProviderErrorKind::PopupBlocked),
		"network-request-failed" | "timeout" | "internal-error" | "too-many-requests" =>
			Some(ProviderErrorKind::Network),
		"user-token-expired" | "requires-recent-login" | "user-disabled" | "invalid-user-token"
		| "user-not-found" => Some(ProviderErrorKind::ReauthRequired),
		"insufficient-scope" | "insufficient_scope" | "invalid_scope" =>
			Some(ProviderErrorKind::ScopeInsufficient),
		_ => None,
	}
}

fn classify_message(message: &str) -> Option<ProviderErrorKind> {
	let lowered = message.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("popup") && text.contains("blocked") =>
			Some(ProviderErrorKind::PopupBlocked),
		text if text.contains("closed by the user") || text.contains("cancelled by the user") =>
			Some(ProviderErrorKind::UserCancelled),
		text if text.contains("network") => Some(ProviderErrorKind::Network),
		text if text.contains("insufficient") && text.contains("scope") =>
			Some(ProviderErrorKind::ScopeInsufficient),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn kind(code: &str, message: &str) -> ProviderErrorKind {
		DefaultProviderStrategy.classify(&ProviderError::new(code, message))
	}

	#[test]
	fn codes_map_with_or_without_prefix() {
		assert_eq!(kind("auth/popup-closed-by-user", ""), ProviderErrorKind::UserCancelled);
		assert_eq!(kind("POPUP-BLOCKED", ""), ProviderErrorKind::PopupBlocked);
		assert_eq!(kind("auth/network-request-failed", ""), ProviderErrorKind::Network);
		assert_eq!(kind("auth/user-token-expired", ""), ProviderErrorKind::ReauthRequired);
		assert_eq!(kind("insufficient_scope", ""), ProviderErrorKind::ScopeInsufficient);
	}

	#[test]
	fn unknown_codes_fall_back_to_message_hints() {
		assert_eq!(kind("x", "The popup was blocked by the browser"), ProviderErrorKind::PopupBlocked);
		assert_eq!(kind("x", "A network error occurred"), ProviderErrorKind::Network);
		assert_eq!(kind("x", "Something odd"), ProviderErrorKind::Other);
	}

	#[test]
	fn kinds_convert_into_taxonomy() {
		let strategy = DefaultProviderStrategy;

		assert!(matches!(
			strategy.to_error(ProviderError::new("auth/popup-blocked", "")),
			Error::PopupBlocked
		));
		assert!(strategy.to_error(ProviderError::new("auth/timeout", "")).is_retryable());
		assert!(
			strategy
				.to_error(ProviderError::new("auth/requires-recent-login", ""))
				.is_identity_level()
		);
		assert!(matches!(
			strategy.to_error(ProviderError::new("auth/quota", "odd")),
			Error::Provider { .. }
		));
	}
}
