// Domain Layer - Queue aggregate and its membership

pub mod error;
pub mod outcome;
pub mod participant;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use outcome::{StartOutcome, ToggleOutcome};
pub use participant::{MembershipState, Participant, ParticipantId};
pub use queue::{Queue, QueueId, QueuePhase};
