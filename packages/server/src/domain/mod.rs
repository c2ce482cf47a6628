//! Domain layer of the chat relay.
//!
//! Value objects (`ConnectionId`, `DisplayName`), the `Participant` entity,
//! inbound `Frame` classification, outbound `Announcement` rendering and the
//! `ParticipantRegistry` contract that the infrastructure layer implements.

mod announcement;
mod connection;
mod error;
mod frame;
mod participant;
mod registry;

pub use announcement::{Announcement, FAREWELL, NICKNAME_PROMPT, SERVER_SENDER, WELCOME};
pub use connection::ConnectionId;
pub use error::DomainError;
pub use frame::Frame;
pub use participant::{DisplayName, MAX_DISPLAY_NAME_CHARS, Participant};
#[cfg(test)]
pub use registry::MockParticipantRegistry;
pub use registry::{BroadcastReport, OutboundChannel, ParticipantRegistry, PushError};
