// Named outcomes of store operations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a join/leave toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

/// Result of a start attempt. `AlreadyStarted` is a benign no-op, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartOutcome {
    Started,
    AlreadyStarted,
}

impl fmt::Display for ToggleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleOutcome::Added => write!(f, "ADDED"),
            ToggleOutcome::Removed => write!(f, "REMOVED"),
        }
    }
}

impl fmt::Display for StartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartOutcome::Started => write!(f, "STARTED"),
            StartOutcome::AlreadyStarted => write!(f, "ALREADY_STARTED"),
        }
    }
}
