// SQLite QueueStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use roster_core::domain::{MembershipState, Participant, Queue, StartOutcome, ToggleOutcome};
use roster_core::error::{AppError, Result};
use roster_core::port::{QueueStore, Shuffler, TimeProvider};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tracing::debug;

/// Relational backend.
///
/// `toggle_membership` is an upsert that flips a soft `state` flag keyed on
/// `(queue_id, participant_id)`. `start` is a compare-and-set on `started`
/// followed by the order write, all in one transaction, so exactly one caller
/// wins even across processes sharing the database file.
pub struct SqliteQueueStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    shuffler: Arc<dyn Shuffler>,
}

impl SqliteQueueStore {
    pub fn new(
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        shuffler: Arc<dyn Shuffler>,
    ) -> Self {
        Self {
            pool,
            time_provider,
            shuffler,
        }
    }

    async fn queue_exists(
        tx: &mut Transaction<'_, Sqlite>,
        queue_id: &str,
    ) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM queues WHERE queue_id = ?")
            .bind(queue_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(found.is_some())
    }

    /// Active members in authoritative order: fixed order first, late joiners after
    async fn active_members(
        tx: &mut Transaction<'_, Sqlite>,
        queue_id: &str,
    ) -> Result<Vec<Participant>> {
        Self::fetch_members(tx, queue_id, "order_number IS NULL, order_number ASC, join_seq ASC")
            .await
    }

    /// Active members in the order they joined
    async fn members_in_join_order(
        tx: &mut Transaction<'_, Sqlite>,
        queue_id: &str,
    ) -> Result<Vec<Participant>> {
        Self::fetch_members(tx, queue_id, "join_seq ASC").await
    }

    async fn fetch_members(
        tx: &mut Transaction<'_, Sqlite>,
        queue_id: &str,
        order_by: &str,
    ) -> Result<Vec<Participant>> {
        let sql = format!(
            "SELECT participant_id, display_name FROM participants \
             WHERE queue_id = ? AND state = 'ACTIVE' ORDER BY {}",
            order_by
        );

        let rows: Vec<ParticipantRow> = sqlx::query_as(&sql)
            .bind(queue_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ParticipantRow::into_participant).collect())
    }

    /// Number of active members ahead of a position in authoritative order
    async fn members_ahead_of(
        tx: &mut Transaction<'_, Sqlite>,
        queue_id: &str,
        order_number: Option<i64>,
        join_seq: i64,
    ) -> Result<i64> {
        let ahead: i64 = match order_number {
            // Everyone with a fixed order sits before a late joiner
            None => sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM participants
                WHERE queue_id = ? AND state = 'ACTIVE'
                  AND (order_number IS NOT NULL OR join_seq < ?)
                "#,
            )
            .bind(queue_id)
            .bind(join_seq)
            .fetch_one(&mut **tx)
            .await,
            Some(order_number) => sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM participants
                WHERE queue_id = ? AND state = 'ACTIVE' AND order_number < ?
                "#,
            )
            .bind(queue_id)
            .bind(order_number)
            .fetch_one(&mut **tx)
            .await,
        }
        .map_err(map_sqlx_error)?;

        Ok(ahead)
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn create(&self, queue_id: &str, description: &str) -> Result<()> {
        let now = self.time_provider.now_millis();

        sqlx::query("INSERT INTO queues (queue_id, description, created_at) VALUES (?, ?, ?)")
            .bind(queue_id)
            .bind(description)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| match map_sqlx_error(e) {
                AppError::Conflict(_) => {
                    AppError::Conflict(format!("Queue {} already exists", queue_id))
                }
                other => other,
            })?;

        Ok(())
    }

    async fn toggle_membership(
        &self,
        queue_id: &str,
        participant: &Participant,
    ) -> Result<ToggleOutcome> {
        let now = self.time_provider.now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Taking the sequence number first grabs the write lock for the whole toggle
        let join_seq: Option<i64> = sqlx::query_scalar(
            "UPDATE queues SET next_join_seq = next_join_seq + 1 WHERE queue_id = ? RETURNING next_join_seq",
        )
        .bind(queue_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let join_seq = join_seq.ok_or_else(|| AppError::queue_not_found(queue_id))?;

        // Re-joining moves the member to the end: fresh join_seq, no fixed order
        let flipped: FlipRow = sqlx::query_as(
            r#"
            INSERT INTO participants (
                queue_id, participant_id, display_name, joined_at, join_seq, order_number, state
            ) VALUES (?, ?, ?, ?, ?, NULL, 'ACTIVE')
            ON CONFLICT (queue_id, participant_id) DO UPDATE SET
                state = CASE participants.state WHEN 'ACTIVE' THEN 'WITHDRAWN' ELSE 'ACTIVE' END,
                display_name = excluded.display_name,
                joined_at = CASE participants.state
                    WHEN 'ACTIVE' THEN participants.joined_at ELSE excluded.joined_at END,
                join_seq = CASE participants.state
                    WHEN 'ACTIVE' THEN participants.join_seq ELSE excluded.join_seq END,
                order_number = CASE participants.state
                    WHEN 'ACTIVE' THEN participants.order_number ELSE NULL END
            RETURNING state, order_number, join_seq
            "#,
        )
        .bind(queue_id)
        .bind(participant.id)
        .bind(&participant.display_name)
        .bind(now)
        .bind(join_seq)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let state = MembershipState::parse(&flipped.state).ok_or_else(|| {
            AppError::InvariantViolation(format!("Unknown membership state: {}", flipped.state))
        })?;

        if state == MembershipState::Withdrawn {
            // A member ahead of the cursor leaving shifts everyone after them
            // one place left, so the cursor follows to stay on the same person
            let position = Self::members_ahead_of(
                &mut tx,
                queue_id,
                flipped.order_number,
                flipped.join_seq,
            )
            .await?;

            sqlx::query(
                r#"
                UPDATE queues
                SET cursor = CASE
                    WHEN ? < cursor THEN cursor - 1
                    ELSE MIN(cursor, (
                        SELECT COUNT(*) FROM participants
                        WHERE queue_id = queues.queue_id AND state = 'ACTIVE'
                    ))
                END
                WHERE queue_id = ?
                "#,
            )
            .bind(position)
            .bind(queue_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(match state {
            MembershipState::Active => ToggleOutcome::Added,
            MembershipState::Withdrawn => ToggleOutcome::Removed,
        })
    }

    async fn snapshot(&self, queue_id: &str) -> Result<Queue> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row: Option<QueueRow> = sqlx::query_as(
            "SELECT queue_id, description, cursor, started FROM queues WHERE queue_id = ?",
        )
        .bind(queue_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let row = row.ok_or_else(|| AppError::queue_not_found(queue_id))?;
        let members = Self::active_members(&mut tx, queue_id).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        row.into_queue(members)
    }

    async fn start(&self, queue_id: &str, shuffle: bool) -> Result<StartOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let flipped = sqlx::query(
            "UPDATE queues SET started = 1, cursor = 0 WHERE queue_id = ? AND started = 0",
        )
        .bind(queue_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if flipped.rows_affected() == 0 {
            let exists = Self::queue_exists(&mut tx, queue_id).await?;
            tx.rollback().await.map_err(map_sqlx_error)?;
            return if exists {
                Ok(StartOutcome::AlreadyStarted)
            } else {
                Err(AppError::queue_not_found(queue_id))
            };
        }

        let mut members = Self::members_in_join_order(&mut tx, queue_id).await?;
        if shuffle {
            self.shuffler.shuffle(&mut members);
        }

        sqlx::query("UPDATE participants SET order_number = NULL WHERE queue_id = ?")
            .bind(queue_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        for (position, member) in members.iter().enumerate() {
            sqlx::query(
                "UPDATE participants SET order_number = ? WHERE queue_id = ? AND participant_id = ?",
            )
            .bind(position as i64)
            .bind(queue_id)
            .bind(member.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(queue_id = %queue_id, members = members.len(), shuffle, "Order fixed");
        Ok(StartOutcome::Started)
    }

    async fn advance(&self, queue_id: &str) -> Result<usize> {
        let advanced: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE queues SET cursor = cursor + 1
            WHERE queue_id = ?
              AND cursor < (
                  SELECT COUNT(*) FROM participants
                  WHERE queue_id = queues.queue_id AND state = 'ACTIVE'
              )
            RETURNING cursor
            "#,
        )
        .bind(queue_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let cursor = match advanced {
            Some(cursor) => cursor,
            None => {
                // Already at the end, or no such queue
                let current: Option<i64> =
                    sqlx::query_scalar("SELECT cursor FROM queues WHERE queue_id = ?")
                        .bind(queue_id)
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(map_sqlx_error)?;
                current.ok_or_else(|| AppError::queue_not_found(queue_id))?
            }
        };

        to_index(cursor)
    }

    async fn reset(&self, queue_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query("UPDATE queues SET cursor = 0, started = 0 WHERE queue_id = ?")
            .bind(queue_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(AppError::queue_not_found(queue_id));
        }

        // Back to collecting: members are listed in join order again
        sqlx::query("UPDATE participants SET order_number = NULL WHERE queue_id = ?")
            .bind(queue_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn finish(&self, queue_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM participants WHERE queue_id = ?")
            .bind(queue_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let deleted = sqlx::query("DELETE FROM queues WHERE queue_id = ?")
            .bind(queue_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(AppError::queue_not_found(queue_id));
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn to_index(cursor: i64) -> Result<usize> {
    usize::try_from(cursor)
        .map_err(|_| AppError::InvariantViolation(format!("Negative cursor: {}", cursor)))
}

#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    queue_id: String,
    description: String,
    cursor: i64,
    started: bool,
}

impl QueueRow {
    fn into_queue(self, members: Vec<Participant>) -> Result<Queue> {
        Ok(Queue {
            id: self.queue_id,
            description: self.description,
            members,
            cursor: to_index(self.cursor)?,
            started: self.started,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FlipRow {
    state: String,
    order_number: Option<i64>,
    join_seq: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ParticipantRow {
    participant_id: i64,
    display_name: String,
}

impl ParticipantRow {
    fn into_participant(self) -> Participant {
        Participant::new(self.participant_id, self.display_name)
    }
}
