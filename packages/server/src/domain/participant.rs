use std::fmt;

use super::{ConnectionId, DomainError, SERVER_SENDER};

/// Maximum number of characters allowed in a display name
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Display name supplied once in the handshake.
///
/// Surrounding whitespace is trimmed. Names are not unique: two participants
/// may share one, since participants are keyed by their connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for DisplayName {
    type Error = DomainError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(DomainError::EmptyDisplayName);
        }
        if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
            return Err(DomainError::DisplayNameTooLong {
                max: MAX_DISPLAY_NAME_CHARS,
            });
        }
        // "Server" is what system notices are attributed to
        if name.eq_ignore_ascii_case(SERVER_SENDER) {
            return Err(DomainError::ReservedDisplayName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }
}

impl TryFrom<String> for DisplayName {
    type Error = DomainError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::try_from(raw.as_str())
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A live registration: a connection and the name it announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ConnectionId,
    pub name: DisplayName,
}

impl Participant {
    pub fn new(id: ConnectionId, name: DisplayName) -> Self {
        Self { id, name }
    }
}
