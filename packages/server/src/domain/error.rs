use thiserror::Error;

/// Validation errors raised by domain value objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The handshake frame was empty after trimming
    #[error("display name must not be empty")]
    EmptyDisplayName,

    /// The handshake frame exceeded the display name limit
    #[error("display name must be at most {max} characters")]
    DisplayNameTooLong { max: usize },

    /// The display name collides with the sender name used for system notices
    #[error("display name '{0}' is reserved")]
    ReservedDisplayName(String),
}
