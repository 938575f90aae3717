//! Delegated token records, freshness classification, and their builder.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::TokenSecret},
};

/// Freshness of a delegated token relative to an instant and a refresh buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// More than the refresh buffer remains.
	Valid,
	/// Still usable, but inside the refresh buffer.
	Expiring,
	/// The expiry instant has passed.
	Expired,
}

/// Errors produced by [`DelegatedTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum DelegatedTokenBuilderError {
	/// No token value (or an empty one) was provided.
	#[error("Delegated token value is required.")]
	MissingValue,
	/// No expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// The lifetime pushes the expiry past the representable date range.
	#[error("Expiry is out of the supported range.")]
	ExpiryOutOfRange,
}

/// Authority to call the spreadsheet API on the user's behalf.
///
/// Distinct from the identity session: this is the only credential
/// [`Coordinator::access_token`](crate::coordinator::Coordinator::access_token) hands out.
#[derive(Clone, Serialize, Deserialize)]
pub struct DelegatedToken {
	/// Bearer value; callers must avoid logging it.
	pub value: TokenSecret,
	/// Scopes the token was granted (empty when never introspected).
	pub scopes: ScopeSet,
	/// Instant the token was acquired.
	pub issued_at: OffsetDateTime,
	/// Instant after which the provider rejects the token.
	pub expires_at: OffsetDateTime,
}
impl DelegatedToken {
	/// Returns a builder for a freshly acquired token.
	pub fn builder() -> DelegatedTokenBuilder {
		DelegatedTokenBuilder::default()
	}

	/// Classifies the token at `instant`, treating `buffer` before expiry as "expiring".
	pub fn status_at(&self, instant: OffsetDateTime, buffer: Duration) -> TokenStatus {
		if instant >= self.expires_at {
			TokenStatus::Expired
		} else if self.expires_at - instant <= buffer {
			TokenStatus::Expiring
		} else {
			TokenStatus::Valid
		}
	}

	/// Lifetime left at `instant`; negative once expired.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		self.expires_at - instant
	}

	/// Returns `true` once `instant` reaches the expiry instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}
impl Debug for DelegatedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DelegatedToken")
			.field("value", &"<redacted>")
			.field("scopes", &self.scopes)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`DelegatedToken`].
#[derive(Clone, Debug, Default)]
pub struct DelegatedTokenBuilder {
	value: Option<TokenSecret>,
	scopes: ScopeSet,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl DelegatedTokenBuilder {
	/// Provides the bearer value.
	pub fn value(mut self, token: impl Into<String>) -> Self {
		self.value = Some(TokenSecret::new(token));

		self
	}

	/// Records the granted scopes.
	pub fn scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}

	/// Sets the acquisition instant (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant; wins over [`expires_in`](Self::expires_in).
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a lifetime relative to the acquisition instant.
	pub fn expires_in(mut self, lifetime: Duration) -> Self {
		self.expires_in = Some(lifetime);

		self
	}

	/// Consumes the builder and produces a [`DelegatedToken`].
	pub fn build(self) -> Result<DelegatedToken, DelegatedTokenBuilderError> {
		let value = self
			.value
			.filter(|value| !value.is_empty())
			.ok_or(DelegatedTokenBuilderError::MissingValue)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at
				.checked_add(delta)
				.ok_or(DelegatedTokenBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(DelegatedTokenBuilderError::MissingExpiry),
		};

		Ok(DelegatedToken { value, scopes: self.scopes, issued_at, expires_at })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn status_honors_refresh_buffer() {
		let token = DelegatedToken::builder()
			.value("ya29.a")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::hours(1))
			.build()
			.expect("Token builder should succeed for status checks.");
		let buffer = Duration::minutes(5);

		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
		assert_eq!(token.status_at(macros::datetime!(2025-01-01 00:30 UTC), buffer), TokenStatus::Valid);
		assert_eq!(
			token.status_at(macros::datetime!(2025-01-01 00:55 UTC), buffer),
			TokenStatus::Expiring
		);
		assert_eq!(
			token.status_at(macros::datetime!(2025-01-01 01:00 UTC), buffer),
			TokenStatus::Expired
		);
		assert_eq!(
			token.remaining_at(macros::datetime!(2025-01-01 01:10 UTC)),
			Duration::minutes(-10)
		);
	}

	#[test]
	fn builder_rejects_missing_parts() {
		assert_eq!(
			DelegatedToken::builder().expires_in(Duration::hours(1)).build().unwrap_err(),
			DelegatedTokenBuilderError::MissingValue
		);
		assert_eq!(
			DelegatedToken::builder().value("").expires_in(Duration::hours(1)).build().unwrap_err(),
			DelegatedTokenBuilderError::MissingValue
		);
		assert_eq!(
			DelegatedToken::builder().value("ya29.b").build().unwrap_err(),
			DelegatedTokenBuilderError::MissingExpiry
		);
	}

	#[test]
	fn oversized_lifetime_is_rejected() {
		assert_eq!(
			DelegatedToken::builder()
				.value("ya29.c")
				.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
				.expires_in(Duration::seconds(100_000_000_000_000))
				.build()
				.unwrap_err(),
			DelegatedTokenBuilderError::ExpiryOutOfRange
		);
	}

	#[test]
	fn debug_redacts_value() {
		let token = DelegatedToken::builder()
			.value("ya29.secret")
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Token builder should succeed for debug output.");

		assert!(!format!("{token:?}").contains("ya29.secret"));
		assert!(!token.is_expired());
	}
}
