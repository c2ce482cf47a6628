//! Connection handlers.

mod tcp;

pub use tcp::handle_connection;
