// Application Layer - Use Cases and Business Logic

pub mod engine;
pub mod guard;

// Re-exports
pub use engine::{
    EngineConfig, LateJoinPolicy, Lookup, MembershipChange, NextStep, QueueEngine, StartReport,
};
pub use guard::{QueueLockGuard, QueueLocks};
