//! Credential secrets and the access-token store.

pub mod secret;
pub mod token;

pub use secret::*;
pub use token::*;
