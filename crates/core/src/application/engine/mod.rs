// Queue Engine - lifecycle state machine over a QueueStore
//
// Collecting --start--> Active --next*--> Exhausted
//     ^                   |                  |
//     +------reset--------+------------------+
// finish from any state deletes the aggregate.

pub mod config;
pub mod report;

#[cfg(test)]
mod engine_test;

pub use config::{EngineConfig, LateJoinPolicy, DEFAULT_OP_TIMEOUT};
pub use report::{Lookup, MembershipChange, NextStep, StartReport};

use crate::application::guard::QueueLocks;
use crate::domain::queue::{truncate_description, validate_queue_id};
use crate::domain::{DomainError, Participant, Queue, QueuePhase, StartOutcome};
use crate::error::{AppError, Result};
use crate::port::QueueStore;
use report::lookup;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Stateless engine: every verb is a store round trip.
///
/// Cheap to clone; clones share the store and the per-queue lock table.
#[derive(Clone)]
pub struct QueueEngine {
    store: Arc<dyn QueueStore>,
    locks: Arc<QueueLocks>,
    config: EngineConfig,
}

impl QueueEngine {
    pub fn new(store: Arc<dyn QueueStore>, config: EngineConfig) -> Self {
        Self {
            store,
            locks: Arc::new(QueueLocks::new()),
            config,
        }
    }

    /// Same engine with a caller-supplied deadline per verb
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut engine = self.clone();
        engine.config.op_timeout = timeout;
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a new queue in the collection phase.
    ///
    /// Descriptions are truncated, not rejected. `AppError::Conflict` if the id is live.
    pub async fn create(&self, queue_id: &str, description: &str) -> Result<Queue> {
        validate(queue_id)?;
        let description = truncate_description(description, self.config.max_description_chars);

        self.bounded("create", queue_id, async {
            self.store.create(queue_id, &description).await?;
            info!(queue_id = %queue_id, description = %description, "Queue created");
            self.verified_snapshot(queue_id).await
        })
        .await
    }

    /// Current state of a queue
    pub async fn snapshot(&self, queue_id: &str) -> Result<Lookup<Queue>> {
        validate(queue_id)?;
        self.bounded("snapshot", queue_id, async {
            lookup(self.verified_snapshot(queue_id).await)
        })
        .await
    }

    /// Join if absent, leave if present. Valid while Collecting or Active.
    pub async fn toggle(
        &self,
        queue_id: &str,
        participant: &Participant,
    ) -> Result<Lookup<MembershipChange>> {
        validate(queue_id)?;

        self.bounded("toggle", queue_id, async {
            let outcome = {
                let _guard = self.locks.acquire(queue_id).await;

                if self.config.late_join == LateJoinPolicy::Reject {
                    let queue = match lookup(self.store.snapshot(queue_id).await)? {
                        Lookup::Found(queue) => queue,
                        Lookup::Missing => return Ok(Lookup::Missing),
                    };
                    if queue.started && !queue.contains(participant.id) {
                        debug!(
                            queue_id = %queue_id,
                            participant_id = participant.id,
                            "Late join rejected"
                        );
                        return Err(AppError::Conflict(format!(
                            "Queue {} has already started",
                            queue_id
                        )));
                    }
                }

                match lookup(self.store.toggle_membership(queue_id, participant).await)? {
                    Lookup::Found(outcome) => outcome,
                    Lookup::Missing => return Ok(Lookup::Missing),
                }
            };

            info!(
                queue_id = %queue_id,
                participant_id = participant.id,
                outcome = %outcome,
                "Membership toggled"
            );

            Ok(lookup(self.verified_snapshot(queue_id).await)?
                .map(|queue| MembershipChange { outcome, queue }))
        })
        .await
    }

    /// Fix the member order and begin iteration.
    ///
    /// Only the first of several concurrent callers transitions the queue;
    /// the rest get `AlreadyStarted` with the current snapshot.
    pub async fn start(&self, queue_id: &str, shuffle: bool) -> Result<Lookup<StartReport>> {
        validate(queue_id)?;

        self.bounded("start", queue_id, async {
            let outcome = {
                let _guard = self.locks.acquire(queue_id).await;
                match lookup(self.store.start(queue_id, shuffle).await)? {
                    Lookup::Found(outcome) => outcome,
                    Lookup::Missing => return Ok(Lookup::Missing),
                }
            };

            match outcome {
                StartOutcome::Started => {
                    info!(queue_id = %queue_id, shuffle, "Queue started")
                }
                StartOutcome::AlreadyStarted => {
                    debug!(queue_id = %queue_id, "Start ignored, queue already started")
                }
            }

            Ok(lookup(self.verified_snapshot(queue_id).await)?
                .map(|queue| StartReport { outcome, queue }))
        })
        .await
    }

    /// Move the cursor to the next participant.
    ///
    /// Once Exhausted the cursor is left alone and the exhausted view is served again.
    pub async fn next(&self, queue_id: &str) -> Result<Lookup<NextStep>> {
        validate(queue_id)?;

        self.bounded("next", queue_id, async {
            let queue = match lookup(self.verified_snapshot(queue_id).await)? {
                Lookup::Found(queue) => queue,
                Lookup::Missing => return Ok(Lookup::Missing),
            };

            match queue.phase() {
                QueuePhase::Collecting => {
                    return Err(AppError::Domain(DomainError::InvalidStateTransition {
                        from: QueuePhase::Collecting.to_string(),
                        to: "NEXT".to_string(),
                    }));
                }
                QueuePhase::Exhausted => {
                    debug!(queue_id = %queue_id, "Queue exhausted, cursor left unchanged");
                    return Ok(Lookup::Found(NextStep::Exhausted { queue }));
                }
                QueuePhase::Active => {}
            }

            let cursor = match lookup(self.store.advance(queue_id).await)? {
                Lookup::Found(cursor) => cursor,
                Lookup::Missing => return Ok(Lookup::Missing),
            };

            let queue = match lookup(self.verified_snapshot(queue_id).await)? {
                Lookup::Found(queue) => queue,
                Lookup::Missing => return Ok(Lookup::Missing),
            };

            info!(
                queue_id = %queue_id,
                cursor,
                members = queue.len(),
                "Advanced to next participant"
            );

            Ok(Lookup::Found(match queue.current().cloned() {
                Some(participant) => NextStep::Current { participant, queue },
                None => NextStep::Exhausted { queue },
            }))
        })
        .await
    }

    /// Back to the collection phase, membership untouched
    pub async fn go_to_menu(&self, queue_id: &str) -> Result<Lookup<Queue>> {
        validate(queue_id)?;

        self.bounded("go_to_menu", queue_id, async {
            if lookup(self.store.reset(queue_id).await)?.is_missing() {
                return Ok(Lookup::Missing);
            }
            info!(queue_id = %queue_id, "Queue returned to menu");
            lookup(self.verified_snapshot(queue_id).await)
        })
        .await
    }

    /// Delete the queue. A second finish reports `Missing`.
    pub async fn finish(&self, queue_id: &str) -> Result<Lookup<()>> {
        validate(queue_id)?;

        self.bounded("finish", queue_id, async {
            let result = lookup(self.store.finish(queue_id).await)?;
            if !result.is_missing() {
                info!(queue_id = %queue_id, "Queue finished");
            }
            Ok(result)
        })
        .await
    }

    /// Release the underlying store
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }

    async fn verified_snapshot(&self, queue_id: &str) -> Result<Queue> {
        let queue = self.store.snapshot(queue_id).await?;
        if let Err(violation) = queue.check_invariants() {
            error!(queue_id = %queue_id, error = %violation, "Queue invariant violated");
            return Err(AppError::InvariantViolation(violation.to_string()));
        }
        Ok(queue)
    }

    async fn bounded<T, F>(&self, op: &'static str, queue_id: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let result = match tokio::time::timeout(self.config.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "{} on queue {} exceeded {:?}",
                op, queue_id, self.config.op_timeout
            ))),
        };

        if let Err(e) = &result {
            if e.is_retryable() {
                warn!(queue_id = %queue_id, op, error = %e, "Queue operation failed");
            }
        }

        result
    }
}

fn validate(queue_id: &str) -> Result<()> {
    validate_queue_id(queue_id).map_err(|e| AppError::Validation(e.to_string()))
}
