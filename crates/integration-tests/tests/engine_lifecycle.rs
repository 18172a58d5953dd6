//! Engine Lifecycle Tests
//!
//! Collecting -> Active -> Exhausted -> Collecting/Gone on real backends.

mod common;

use common::{all_backends, ids, person};
use roster_core::application::{EngineConfig, LateJoinPolicy, Lookup, NextStep, QueueEngine};
use roster_core::domain::{DomainError, QueuePhase, StartOutcome, ToggleOutcome};
use roster_core::error::AppError;
use roster_core::port::shuffler::ReverseShuffler;
use roster_core::port::time_provider::SystemTimeProvider;
use roster_infra_document::{DocumentCollection, DocumentQueueStore};
use roster_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_three_members_walk_to_exhausted() {
    for fx in all_backends().await {
        let engine = fx.engine();
        engine.create("m1", "Lunch").await.unwrap();
        for id in 1..=3 {
            engine.toggle("m1", &person(id)).await.unwrap();
        }

        let report = engine.start("m1", false).await.unwrap().found().unwrap();
        assert_eq!(report.outcome, StartOutcome::Started);
        assert_eq!(report.queue.cursor, 0);
        assert_eq!(report.queue.current(), Some(&person(1)));

        let first = engine.next("m1").await.unwrap().found().unwrap();
        assert!(matches!(&first, NextStep::Current { participant, .. } if participant.id == 2));

        let second = engine.next("m1").await.unwrap().found().unwrap();
        assert!(matches!(&second, NextStep::Current { participant, .. } if participant.id == 3));

        let third = engine.next("m1").await.unwrap().found().unwrap();
        assert!(third.is_exhausted(), "{}", fx.name);
        assert_eq!(third.queue().cursor, 3);
        assert_eq!(third.queue().phase(), QueuePhase::Exhausted);

        // Further taps re-serve the exhausted view without moving the cursor
        let again = engine.next("m1").await.unwrap().found().unwrap();
        assert!(again.is_exhausted());
        assert_eq!(again.queue().cursor, 3, "{}", fx.name);
    }
}

#[tokio::test]
async fn test_menu_then_restart() {
    for fx in all_backends().await {
        let engine = fx.engine();
        engine.create("m1", "Lunch").await.unwrap();
        for id in 1..=2 {
            engine.toggle("m1", &person(id)).await.unwrap();
        }
        engine.start("m1", false).await.unwrap();
        engine.next("m1").await.unwrap();
        engine.next("m1").await.unwrap();

        let queue = engine.go_to_menu("m1").await.unwrap().found().unwrap();
        assert_eq!(queue.phase(), QueuePhase::Collecting, "{}", fx.name);
        assert_eq!(ids(&queue), vec![1, 2]);

        let report = engine.start("m1", false).await.unwrap().found().unwrap();
        assert_eq!(report.outcome, StartOutcome::Started, "{}", fx.name);
        assert_eq!(report.queue.current(), Some(&person(1)));
    }
}

#[tokio::test]
async fn test_next_while_collecting_is_rejected() {
    for fx in all_backends().await {
        let engine = fx.engine();
        engine.create("m1", "Lunch").await.unwrap();
        engine.toggle("m1", &person(1)).await.unwrap();

        let err = engine.next("m1").await.unwrap_err();
        assert!(
            matches!(err, AppError::Domain(DomainError::InvalidStateTransition { .. })),
            "{}: {:?}",
            fx.name,
            err
        );
    }
}

#[tokio::test]
async fn test_finished_queue_is_missing_everywhere() {
    for fx in all_backends().await {
        let engine = fx.engine();
        engine.create("m1", "Lunch").await.unwrap();
        engine.toggle("m1", &person(1)).await.unwrap();

        assert_eq!(engine.finish("m1").await.unwrap(), Lookup::Found(()));
        assert!(engine.finish("m1").await.unwrap().is_missing(), "{}", fx.name);
        assert!(engine.snapshot("m1").await.unwrap().is_missing());
        assert!(engine.toggle("m1", &person(2)).await.unwrap().is_missing());
        assert!(engine.start("m1", true).await.unwrap().is_missing());
        assert!(engine.next("m1").await.unwrap().is_missing());
        assert!(engine.go_to_menu("m1").await.unwrap().is_missing());
    }
}

#[tokio::test]
async fn test_late_joiner_is_visited() {
    for fx in all_backends().await {
        let engine = fx.engine();
        engine.create("m1", "Lunch").await.unwrap();
        engine.toggle("m1", &person(1)).await.unwrap();
        engine.start("m1", false).await.unwrap();

        let change = engine.toggle("m1", &person(2)).await.unwrap().found().unwrap();
        assert_eq!(change.outcome, ToggleOutcome::Added);

        let step = engine.next("m1").await.unwrap().found().unwrap();
        assert!(
            matches!(&step, NextStep::Current { participant, .. } if participant.id == 2),
            "{}",
            fx.name
        );
    }
}

#[tokio::test]
async fn test_late_join_reject_policy() {
    for fx in all_backends().await {
        let engine = fx.engine_with(EngineConfig {
            late_join: LateJoinPolicy::Reject,
            ..EngineConfig::default()
        });
        engine.create("m1", "Lunch").await.unwrap();
        engine.toggle("m1", &person(1)).await.unwrap();
        engine.toggle("m1", &person(2)).await.unwrap();
        engine.start("m1", false).await.unwrap();

        assert!(
            matches!(
                engine.toggle("m1", &person(3)).await,
                Err(AppError::Conflict(_))
            ),
            "{}",
            fx.name
        );

        // Leaving is always allowed
        let change = engine.toggle("m1", &person(2)).await.unwrap().found().unwrap();
        assert_eq!(change.outcome, ToggleOutcome::Removed);
        assert_eq!(ids(&change.queue), vec![1]);
    }
}

#[tokio::test]
async fn test_member_leaving_at_the_end_exhausts_queue() {
    for fx in all_backends().await {
        let engine = fx.engine();
        engine.create("m1", "Lunch").await.unwrap();
        for id in 1..=2 {
            engine.toggle("m1", &person(id)).await.unwrap();
        }
        engine.start("m1", false).await.unwrap();
        engine.next("m1").await.unwrap();

        // Bob is up and leaves; cursor is clamped to the new length
        let change = engine.toggle("m1", &person(2)).await.unwrap().found().unwrap();
        assert_eq!(change.queue.cursor, 1, "{}", fx.name);
        assert_eq!(change.queue.phase(), QueuePhase::Exhausted);
    }
}

#[tokio::test]
async fn test_long_description_is_truncated() {
    for fx in all_backends().await {
        let engine = fx.engine();
        let queue = engine.create("m1", &"x".repeat(250)).await.unwrap();
        assert_eq!(queue.description.chars().count(), 100, "{}", fx.name);
    }
}

#[tokio::test]
async fn test_caller_deadline_applies() {
    for fx in all_backends().await {
        let engine = fx.engine().with_timeout(Duration::from_secs(2));
        engine.create("m1", "Lunch").await.unwrap();
        assert_eq!(engine.config().op_timeout, Duration::from_secs(2));

        let queue = engine.snapshot("m1").await.unwrap().found().unwrap();
        assert_eq!(queue.description, "Lunch", "{}", fx.name);
    }
}

async fn open_document(path: &Path) -> QueueEngine {
    let collection = DocumentCollection::open(path).await.unwrap();
    QueueEngine::new(
        Arc::new(DocumentQueueStore::new(
            Arc::new(collection),
            Arc::new(ReverseShuffler),
        )),
        EngineConfig::default(),
    )
}

async fn open_sqlite(path: &Path) -> QueueEngine {
    let pool = create_pool(path.to_str().unwrap()).await.unwrap();
    run_migrations(&pool).await.unwrap();
    QueueEngine::new(
        Arc::new(SqliteQueueStore::new(
            pool,
            Arc::new(SystemTimeProvider),
            Arc::new(ReverseShuffler),
        )),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn test_document_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queues.json");

    let engine = open_document(&path).await;
    engine.create("m1", "Lunch").await.unwrap();
    engine.toggle("m1", &person(1)).await.unwrap();
    engine.toggle("m1", &person(2)).await.unwrap();
    engine.start("m1", true).await.unwrap();
    engine.next("m1").await.unwrap();
    engine.close().await.unwrap();

    let engine = open_document(&path).await;
    let queue = engine.snapshot("m1").await.unwrap().found().unwrap();
    assert!(queue.started);
    assert_eq!(queue.cursor, 1);
    assert_eq!(ids(&queue), vec![2, 1]);
}

#[tokio::test]
async fn test_sqlite_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");

    let engine = open_sqlite(&path).await;
    engine.create("m1", "Lunch").await.unwrap();
    engine.toggle("m1", &person(1)).await.unwrap();
    engine.toggle("m1", &person(2)).await.unwrap();
    engine.start("m1", true).await.unwrap();
    engine.close().await.unwrap();

    let engine = open_sqlite(&path).await;
    let queue = engine.snapshot("m1").await.unwrap().found().unwrap();
    assert!(queue.started);
    assert_eq!(ids(&queue), vec![2, 1]);
}
