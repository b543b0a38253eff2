use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors at the framing layer. Per-connection policy: drop the offending
/// frame or the connection, never the process.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum ProtocolError {
    #[error("unknown message type {0:#06x}")]
    UnknownMessageType(u16),
    #[error("declared payload of {0} bytes exceeds the frame size limit")]
    PayloadTooLarge(u32),
    #[error("malformed payload for message type {0:#06x}")]
    MalformedPayload(u16),
}

/// Typed reply for a request the server refuses to act on. Sent to the
/// originating session only; the offending request never mutates state.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestError {
    #[error("not logged in")]
    NotAuthenticated,
    #[error("already logged in")]
    AlreadyLoggedIn,
    #[error("game not found")]
    GameNotFound,
    #[error("you are not a player in this game")]
    NotAParticipant,
    #[error("the game is already over")]
    GameAlreadyOver,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("internal error: {message}")]
    Internal { message: String },
}
