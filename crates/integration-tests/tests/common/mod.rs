//! Shared fixtures: every backend behind the same `QueueStore` port

#![allow(dead_code)]

use roster_core::application::{EngineConfig, QueueEngine};
use roster_core::domain::{Participant, Queue};
use roster_core::port::shuffler::{RandomShuffler, ReverseShuffler, Shuffler};
use roster_core::port::time_provider::SystemTimeProvider;
use roster_core::port::QueueStore;
use roster_infra_document::{DocumentCollection, DocumentQueueStore};
use roster_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};
use std::sync::Arc;
use tempfile::TempDir;

/// A store under test. Holds the temp dir (if any) so files outlive the test body.
pub struct Fixture {
    pub name: &'static str,
    pub store: Arc<dyn QueueStore>,
    _dir: Option<TempDir>,
}

impl Fixture {
    pub fn engine(&self) -> QueueEngine {
        QueueEngine::new(self.store.clone(), EngineConfig::default())
    }

    pub fn engine_with(&self, config: EngineConfig) -> QueueEngine {
        QueueEngine::new(self.store.clone(), config)
    }
}

pub async fn sqlite_memory(shuffler: Arc<dyn Shuffler>) -> Fixture {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    Fixture {
        name: "sqlite-memory",
        store: Arc::new(SqliteQueueStore::new(
            pool,
            Arc::new(SystemTimeProvider),
            shuffler,
        )),
        _dir: None,
    }
}

/// File database with WAL and a multi-connection pool
pub async fn sqlite_file(shuffler: Arc<dyn Shuffler>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");
    let pool = create_pool(path.to_str().unwrap()).await.unwrap();
    run_migrations(&pool).await.unwrap();
    Fixture {
        name: "sqlite-file",
        store: Arc::new(SqliteQueueStore::new(
            pool,
            Arc::new(SystemTimeProvider),
            shuffler,
        )),
        _dir: Some(dir),
    }
}

pub async fn document_memory(shuffler: Arc<dyn Shuffler>) -> Fixture {
    Fixture {
        name: "document-memory",
        store: Arc::new(DocumentQueueStore::new(
            Arc::new(DocumentCollection::in_memory()),
            shuffler,
        )),
        _dir: None,
    }
}

pub async fn document_file(shuffler: Arc<dyn Shuffler>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let collection = DocumentCollection::open(dir.path().join("queues.json"))
        .await
        .unwrap();
    Fixture {
        name: "document-file",
        store: Arc::new(DocumentQueueStore::new(Arc::new(collection), shuffler)),
        _dir: Some(dir),
    }
}

/// Every backend with a deterministic (reversing) shuffler
pub async fn all_backends() -> Vec<Fixture> {
    vec![
        sqlite_memory(Arc::new(ReverseShuffler)).await,
        sqlite_file(Arc::new(ReverseShuffler)).await,
        document_memory(Arc::new(ReverseShuffler)).await,
        document_file(Arc::new(ReverseShuffler)).await,
    ]
}

/// Every backend with the production shuffler
pub async fn all_backends_random() -> Vec<Fixture> {
    vec![
        sqlite_memory(Arc::new(RandomShuffler)).await,
        sqlite_file(Arc::new(RandomShuffler)).await,
        document_memory(Arc::new(RandomShuffler)).await,
        document_file(Arc::new(RandomShuffler)).await,
    ]
}

pub fn person(id: i64) -> Participant {
    Participant::new(id, format!("user-{}", id))
}

pub fn ids(queue: &Queue) -> Vec<i64> {
    queue.members.iter().map(|m| m.id).collect()
}
