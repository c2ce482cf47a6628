//! Utilities shared by the hiroba server and client.

pub mod logger;
pub mod time;
