use std::fmt;

use chrono::{DateTime, FixedOffset};
use hiroba_shared::time::format_clock_time;

use super::DisplayName;

/// Sender name that system notices are attributed to
pub const SERVER_SENDER: &str = "Server";

/// Sent right after accept, before the handshake line is read
pub const NICKNAME_PROMPT: &str = "Enter your nickname:";
/// Sent to a newcomer once its handshake succeeded, before anything else
pub const WELCOME: &str = "Connected to the server! Type 'exit' to leave.";
/// Sent to a participant that left with `exit`
pub const FAREWELL: &str = "You have left the chat. Goodbye!";

/// An outbound message, derived when it is sent and never stored.
///
/// Rendered as one line: `[<HH:MM AM/PM>] <sender>: <text>`, where the sender
/// is either a participant's display name or the literal `Server`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    /// Chat text relayed from a participant
    Chat {
        at: DateTime<FixedOffset>,
        sender: DisplayName,
        body: String,
    },
    /// System notice (join, leave, forced disconnect)
    Notice {
        at: DateTime<FixedOffset>,
        text: String,
    },
}

impl Announcement {
    pub fn chat(at: DateTime<FixedOffset>, sender: &DisplayName, body: &str) -> Self {
        Self::Chat {
            at,
            sender: sender.clone(),
            body: body.to_string(),
        }
    }

    pub fn joined(at: DateTime<FixedOffset>, name: &DisplayName) -> Self {
        Self::Notice {
            at,
            text: format!("{} joined the chat!", name),
        }
    }

    pub fn left(at: DateTime<FixedOffset>, name: &DisplayName) -> Self {
        Self::Notice {
            at,
            text: format!("{} left the chat.", name),
        }
    }

    pub fn disconnected_unexpectedly(at: DateTime<FixedOffset>, name: &DisplayName) -> Self {
        Self::Notice {
            at,
            text: format!("{} has been disconnected unexpectedly.", name),
        }
    }

    pub fn sender(&self) -> &str {
        match self {
            Self::Chat { sender, .. } => sender.as_str(),
            Self::Notice { .. } => SERVER_SENDER,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Chat { body, .. } => body,
            Self::Notice { text, .. } => text,
        }
    }

    fn at(&self) -> &DateTime<FixedOffset> {
        match self {
            Self::Chat { at, .. } | Self::Notice { at, .. } => at,
        }
    }

    /// Render the wire line (without the trailing newline)
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            format_clock_time(self.at()),
            self.sender(),
            self.text()
        )
    }
}
