use std::fmt;

use uuid::Uuid;

/// Opaque handle of one accepted connection.
///
/// A fresh id is generated for every accepted socket and never reused, so a
/// participant is always addressed by its connection rather than its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a new, never-before-seen connection id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
