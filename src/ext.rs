//! Extension points the surrounding application plugs into the gateway.
//!
//! - [`SessionListener`] receives the "session is gone" signal after a failed renewal so the
//!   UI layer can force a logout and route to the login screen.
//! - [`RequestSigner`] decides how the access token is written onto an outbound request.

pub mod request_signer;
pub mod session_listener;

pub use request_signer::*;
pub use session_listener::*;
