/// Word a participant sends to leave the chat
const EXIT_COMMAND: &str = "exit";

/// Meaning of one inbound text frame from an active participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Explicit request to leave (`exit`, any case)
    Exit,
    /// Nothing but whitespace; dropped silently
    Blank,
    /// Chat text to relay, trimmed
    Chat(&'a str),
}

impl<'a> Frame<'a> {
    pub fn classify(raw: &'a str) -> Self {
        let body = raw.trim();
        if body.is_empty() {
            Frame::Blank
        } else if body.eq_ignore_ascii_case(EXIT_COMMAND) {
            Frame::Exit
        } else {
            Frame::Chat(body)
        }
    }
}
