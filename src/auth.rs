//! Identity, scope, and delegated-token models owned by the coordinator.

pub mod id;
pub mod identity;
pub mod scope;
pub mod token;

pub use id::*;
pub use identity::*;
pub use scope::*;
pub use token::{record::*, secret::*};
