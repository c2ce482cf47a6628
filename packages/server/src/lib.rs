//! Line-based TCP chat relay.
//!
//! Accepts TCP connections, registers each as a named participant after a
//! one-line handshake, and rebroadcasts every line a participant sends to all
//! other participants.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
