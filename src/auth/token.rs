//! Delegated API token model and its redacting secret wrapper.

pub mod record;
pub mod secret;
