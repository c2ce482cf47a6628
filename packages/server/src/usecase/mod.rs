//! UseCase layer: participant lifecycle and message relay.

mod connect_participant;
mod disconnect_participant;
mod error;
mod send_message;

pub use connect_participant::ConnectParticipantUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::ConnectError;
pub use send_message::{FrameOutcome, SendMessageUseCase};
