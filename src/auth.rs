//! Credential types: the access/refresh pair and the redacting secret wrapper.

pub mod pair;
pub mod secret;

pub use pair::*;
pub use secret::*;
