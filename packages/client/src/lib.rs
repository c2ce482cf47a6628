//! Line-based CLI client for the hiroba chat relay.
//!
//! Prints every line the server sends and forwards every line typed on stdin.

pub mod error;
pub mod session;

pub use error::ClientError;
pub use session::run_client_session;
