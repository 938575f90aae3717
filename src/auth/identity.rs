//! The signed-in subject as reported by the identity provider.

// self
use crate::{_prelude::*, auth::UserId};

/// Authenticated user session as seen by the application.
///
/// At most one identity is current at any time; the coordinator owns it exclusively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Provider-issued subject identifier.
	pub id: UserId,
	/// Primary email address reported by the provider.
	pub email: String,
	/// Human-readable name, if the provider shares one.
	pub display_name: Option<String>,
}
impl Identity {
	/// Creates an identity with the mandatory fields.
	pub fn new(id: UserId, email: impl Into<String>) -> Self {
		Self { id, email: email.into(), display_name: None }
	}

	/// Attaches a display name.
	pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = Some(name.into());

		self
	}

	/// Name suitable for greeting the user; falls back to the email address.
	pub fn label(&self) -> &str {
		self.display_name.as_deref().filter(|name| !name.is_empty()).unwrap_or(&self.email)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn label_prefers_display_name() {
		let id = UserId::new("uid-1").expect("User fixture should be valid.");
		let bare = Identity::new(id.clone(), "ana@example.com");

		assert_eq!(bare.label(), "ana@example.com");

		let named = bare.clone().with_display_name("Ana");

		assert_eq!(named.label(), "Ana");
		assert_eq!(Identity::new(id, "ana@example.com").with_display_name("").label(), "ana@example.com");
	}
}
