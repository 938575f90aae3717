//! Token source contract consumed by spreadsheet API wrappers.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Boxed future returned by [`AccessTokenSource::access_token`].
pub type TokenSourceFuture<'a> = Pin<Box<dyn Future<Output = Option<TokenSecret>> + 'a + Send>>;

/// Anything that can hand out a current delegated token.
pub trait AccessTokenSource
where
	Self: Send + Sync,
{
	/// Returns a usable token, or `None` when the caller must prompt for sign-in.
	fn access_token(&self) -> TokenSourceFuture<'_>;

	/// Reports that an API call was rejected with the current token.
	fn report_rejected(&self);
}
