// Queue Domain Model (aggregate root)

use super::error::{DomainError, Result};
use super::participant::{Participant, ParticipantId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Queue identifier (opaque handle supplied by the chat adapter)
pub type QueueId = String;

/// Upper bound on queue id length in bytes
pub const MAX_QUEUE_ID_BYTES: usize = 255;

/// Descriptions longer than this are truncated at creation
pub const MAX_DESCRIPTION_CHARS: usize = 100;

/// Derived lifecycle phase. `Exhausted` is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueuePhase {
    Collecting,
    Active,
    Exhausted,
}

impl fmt::Display for QueuePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueuePhase::Collecting => write!(f, "COLLECTING"),
            QueuePhase::Active => write!(f, "ACTIVE"),
            QueuePhase::Exhausted => write!(f, "EXHAUSTED"),
        }
    }
}

/// Consistent snapshot of a queue and its members in authoritative order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    pub id: QueueId,
    pub description: String,
    pub members: Vec<Participant>,
    pub cursor: usize,
    pub started: bool,
}

impl Queue {
    /// Fresh queue in the collection phase
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            members: Vec::new(),
            cursor: 0,
            started: false,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn phase(&self) -> QueuePhase {
        if !self.started {
            QueuePhase::Collecting
        } else if self.cursor >= self.members.len() {
            QueuePhase::Exhausted
        } else {
            QueuePhase::Active
        }
    }

    /// Participant currently up, only while Active
    pub fn current(&self) -> Option<&Participant> {
        match self.phase() {
            QueuePhase::Active => self.members.get(self.cursor),
            _ => None,
        }
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    /// Check the aggregate invariants: unique member ids, `cursor <= len`.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.members.len());
        for member in &self.members {
            if !seen.insert(member.id) {
                return Err(DomainError::DuplicateMember {
                    queue_id: self.id.clone(),
                    participant_id: member.id,
                });
            }
        }

        if self.cursor > self.members.len() {
            return Err(DomainError::CursorOutOfBounds {
                queue_id: self.id.clone(),
                cursor: self.cursor,
                len: self.members.len(),
            });
        }

        Ok(())
    }
}

/// Reject empty or oversized queue ids
pub fn validate_queue_id(queue_id: &str) -> Result<()> {
    if queue_id.trim().is_empty() {
        return Err(DomainError::ValidationError(
            "Queue id cannot be empty".to_string(),
        ));
    }

    if queue_id.len() > MAX_QUEUE_ID_BYTES {
        return Err(DomainError::ValidationError(format!(
            "Queue id too long: {} bytes (max {})",
            queue_id.len(),
            MAX_QUEUE_ID_BYTES
        )));
    }

    Ok(())
}

/// Truncate on a char boundary
pub fn truncate_description(description: &str, max_chars: usize) -> String {
    description.chars().take(max_chars).collect()
}
