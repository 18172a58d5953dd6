// Engine configuration (no magic values)

use crate::domain::queue::MAX_DESCRIPTION_CHARS;
use crate::error::AppError;
use std::str::FromStr;
use std::time::Duration;

/// Default deadline for one engine verb, lock wait included (5s)
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// What happens when someone joins a queue that has already started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LateJoinPolicy {
    /// Late joiner goes to the end of the active order
    #[default]
    Append,
    /// Joining an Active queue is refused; leaving is still allowed
    Reject,
}

impl FromStr for LateJoinPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(LateJoinPolicy::Append),
            "reject" => Ok(LateJoinPolicy::Reject),
            other => Err(AppError::Config(format!(
                "Unknown late-join policy '{}' (expected 'append' or 'reject')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub op_timeout: Duration,
    pub late_join: LateJoinPolicy,
    pub max_description_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            op_timeout: DEFAULT_OP_TIMEOUT,
            late_join: LateJoinPolicy::default(),
            max_description_chars: MAX_DESCRIPTION_CHARS,
        }
    }
}
