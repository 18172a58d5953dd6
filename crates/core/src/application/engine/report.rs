// Engine results handed back to the chat adapter for rendering

use crate::domain::{Participant, Queue, StartOutcome, ToggleOutcome};
use crate::error::{AppError, Result};
use serde::Serialize;

/// Typed "queue not available" outcome.
///
/// Callers branch on a missing queue routinely (stale buttons on a finished
/// queue), so it is a value here rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Missing,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Missing => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::Missing => Lookup::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Lookup::Missing)
    }

    /// Turn `Missing` back into `AppError::NotFound`
    pub fn into_result(self, queue_id: &str) -> Result<T> {
        match self {
            Lookup::Found(value) => Ok(value),
            Lookup::Missing => Err(AppError::queue_not_found(queue_id)),
        }
    }
}

/// Lift a store result into a `Lookup`, keeping every other error
pub(crate) fn lookup<T>(result: Result<T>) -> Result<Lookup<T>> {
    match result {
        Ok(value) => Ok(Lookup::Found(value)),
        Err(AppError::NotFound(_)) => Ok(Lookup::Missing),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipChange {
    pub outcome: ToggleOutcome,
    pub queue: Queue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartReport {
    pub outcome: StartOutcome,
    pub queue: Queue,
}

/// Result of `next()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextStep {
    /// The participant now at the cursor
    Current {
        participant: Participant,
        queue: Queue,
    },
    /// Everyone has been visited; offer reset or finish
    Exhausted { queue: Queue },
}

impl NextStep {
    pub fn queue(&self) -> &Queue {
        match self {
            NextStep::Current { queue, .. } | NextStep::Exhausted { queue } => queue,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, NextStep::Exhausted { .. })
    }
}
