//! Extension contracts for handing delegated tokens to API clients.
//!
//! [`AccessTokenSource`] is what API wrappers depend on instead of the concrete coordinator;
//! [`RequestSignerExt`] attaches a token to whatever request type the caller's HTTP client uses.

pub mod request_signer;
pub mod token_source;

pub use request_signer::*;
pub use token_source::*;
