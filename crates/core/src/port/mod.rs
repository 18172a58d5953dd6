// Port Layer - Interfaces for external dependencies

pub mod queue_store;
pub mod shuffler; // For deterministic testing
pub mod time_provider;

// Re-exports
pub use queue_store::QueueStore;
pub use shuffler::{RandomShuffler, Shuffler};
pub use time_provider::TimeProvider;
