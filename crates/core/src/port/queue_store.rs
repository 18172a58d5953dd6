// Queue Store Port (Interface)

use crate::domain::{Participant, Queue, StartOutcome, ToggleOutcome};
use crate::error::Result;
use async_trait::async_trait;

/// Durable state for all queues and their membership.
///
/// Every operation is atomic with respect to every other operation on the same
/// `queue_id`. Operations on a missing queue fail with `AppError::NotFound`.
/// Storage errors are never swallowed.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Insert an empty, unstarted queue. `AppError::Conflict` if the id is live.
    async fn create(&self, queue_id: &str, description: &str) -> Result<()>;

    /// Append the participant if absent, remove them if present.
    ///
    /// Single atomic read-modify-write: concurrent toggles of different
    /// participants never lose each other's update.
    async fn toggle_membership(
        &self,
        queue_id: &str,
        participant: &Participant,
    ) -> Result<ToggleOutcome>;

    /// Consistent read of description, members (authoritative order), cursor and started flag
    async fn snapshot(&self, queue_id: &str) -> Result<Queue>;

    /// Flip `started` false -> true exactly once, fixing member order
    /// (shuffled, or the current order as is) and resetting the cursor to 0.
    async fn start(&self, queue_id: &str, shuffle: bool) -> Result<StartOutcome>;

    /// Atomically increment the cursor and return the new value.
    /// The cursor never exceeds the member count; at the end the value is returned unchanged.
    async fn advance(&self, queue_id: &str) -> Result<usize>;

    /// Back to the collection phase: cursor 0, started false, membership untouched
    async fn reset(&self, queue_id: &str) -> Result<()>;

    /// Delete the queue and all of its membership records in one transaction
    async fn finish(&self, queue_id: &str) -> Result<()>;

    /// Release backend resources
    async fn close(&self) -> Result<()>;
}
