//! Chat Error Types

use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Both participants are required to open a conversation")]
    MissingParticipant,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("No conversation is open")]
    NoConversation,

    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    #[error("Message {0} has not failed")]
    NotFailed(String),

    #[error("Live channel error: {0}")]
    Transport(String),

    #[error("Live channel is closed")]
    Closed,

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type ChatResult<T> = Result<T, ChatError>;
