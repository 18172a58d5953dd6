// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid queue state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Participant {participant_id} appears more than once in queue {queue_id}")]
    DuplicateMember {
        queue_id: String,
        participant_id: i64,
    },

    #[error("Cursor {cursor} out of bounds for queue {queue_id} with {len} members")]
    CursorOutOfBounds {
        queue_id: String,
        cursor: usize,
        len: usize,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
