// Document QueueStore Implementation

use crate::collection::DocumentCollection;
use crate::document::QueueDocument;
use async_trait::async_trait;
use roster_core::application::QueueLocks;
use roster_core::domain::{Participant, Queue, StartOutcome, ToggleOutcome};
use roster_core::error::{AppError, Result};
use roster_core::port::{QueueStore, Shuffler};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Attempts at the version-checked start write before giving up
const START_WRITE_ATTEMPTS: usize = 8;

/// Document backend: one document per queue with members embedded.
///
/// Every membership change is a single-document update, so concurrent toggles
/// never lose each other. `start` reads, shuffles, then writes the order back
/// only if the document version is unchanged and the queue is not started yet,
/// all under an advisory per-queue lock that toggles also respect.
pub struct DocumentQueueStore {
    collection: Arc<DocumentCollection>,
    start_locks: QueueLocks,
    shuffler: Arc<dyn Shuffler>,
    closed: AtomicBool,
}

impl DocumentQueueStore {
    pub fn new(collection: Arc<DocumentCollection>, shuffler: Arc<dyn Shuffler>) -> Self {
        Self {
            collection,
            start_locks: QueueLocks::new(),
            shuffler,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AppError::Storage("Document store is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl QueueStore for DocumentQueueStore {
    async fn create(&self, queue_id: &str, description: &str) -> Result<()> {
        self.ensure_open()?;
        self.collection
            .insert_one(QueueDocument::new(queue_id, description))
            .await
    }

    async fn toggle_membership(
        &self,
        queue_id: &str,
        participant: &Participant,
    ) -> Result<ToggleOutcome> {
        self.ensure_open()?;
        let _lock = self.start_locks.acquire(queue_id).await;

        let outcome = self
            .collection
            .update_one(queue_id, |doc| {
                if doc.remove_user(participant.id) {
                    ToggleOutcome::Removed
                } else {
                    doc.add_user(participant.clone());
                    ToggleOutcome::Added
                }
            })
            .await?;

        outcome.ok_or_else(|| AppError::queue_not_found(queue_id))
    }

    async fn snapshot(&self, queue_id: &str) -> Result<Queue> {
        self.ensure_open()?;
        self.collection
            .find_one(queue_id)
            .await
            .map(QueueDocument::into_queue)
            .ok_or_else(|| AppError::queue_not_found(queue_id))
    }

    async fn start(&self, queue_id: &str, shuffle: bool) -> Result<StartOutcome> {
        self.ensure_open()?;
        let _lock = self.start_locks.acquire(queue_id).await;

        for attempt in 1..=START_WRITE_ATTEMPTS {
            let read = self
                .collection
                .find_one(queue_id)
                .await
                .ok_or_else(|| AppError::queue_not_found(queue_id))?;

            if read.started {
                return Ok(StartOutcome::AlreadyStarted);
            }

            let mut order = read.joined.clone();
            if shuffle {
                self.shuffler.shuffle(&mut order);
            }

            let written = self
                .collection
                .update_one(queue_id, |doc| {
                    if doc.started {
                        return Some(StartOutcome::AlreadyStarted);
                    }
                    if doc.version != read.version {
                        return None;
                    }
                    doc.users = order;
                    doc.current_user_index = 0;
                    doc.started = true;
                    Some(StartOutcome::Started)
                })
                .await?
                .ok_or_else(|| AppError::queue_not_found(queue_id))?;

            match written {
                Some(outcome) => {
                    debug!(queue_id = %queue_id, shuffle, attempt, "Order fixed");
                    return Ok(outcome);
                }
                None => {
                    debug!(queue_id = %queue_id, attempt, "Queue changed during start, retrying");
                }
            }
        }

        warn!(queue_id = %queue_id, attempts = START_WRITE_ATTEMPTS, "Start kept losing to concurrent writes");
        Err(AppError::Conflict(format!(
            "Queue {} kept changing while starting",
            queue_id
        )))
    }

    async fn advance(&self, queue_id: &str) -> Result<usize> {
        self.ensure_open()?;
        self.collection
            .update_one(queue_id, |doc| {
                if doc.current_user_index < doc.users.len() {
                    doc.current_user_index += 1;
                }
                doc.current_user_index
            })
            .await?
            .ok_or_else(|| AppError::queue_not_found(queue_id))
    }

    async fn reset(&self, queue_id: &str) -> Result<()> {
        self.ensure_open()?;
        self.collection
            .update_one(queue_id, |doc| {
                doc.users = doc.joined.clone();
                doc.current_user_index = 0;
                doc.started = false;
            })
            .await?
            .ok_or_else(|| AppError::queue_not_found(queue_id))
    }

    async fn finish(&self, queue_id: &str) -> Result<()> {
        self.ensure_open()?;
        if self.collection.delete_one(queue_id).await? {
            Ok(())
        } else {
            Err(AppError::queue_not_found(queue_id))
        }
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.collection.flush().await?;
        let documents = self.collection.len().await;
        info!(documents, "Document store closed");
        Ok(())
    }
}
