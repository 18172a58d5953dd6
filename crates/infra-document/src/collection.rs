// Embedded document collection
//
// Each operation touches one document and is atomic. Writers to the same
// document are serialized by a per-document lock; readers never wait on disk.
// When a backing file is configured, a change is flushed (unique temp file,
// fsync, rename) before it becomes visible, and that commit runs to completion
// on its own task even if the caller stops waiting for it.

use crate::document::QueueDocument;
use roster_core::application::{QueueLockGuard, QueueLocks};
use roster_core::error::{AppError, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

type Documents = Arc<RwLock<HashMap<String, QueueDocument>>>;

pub struct DocumentCollection {
    docs: Documents,
    doc_locks: QueueLocks,
    backing: Option<Backing>,
}

/// Backing file plus the lock that orders flushes to it
#[derive(Clone)]
struct Backing {
    path: PathBuf,
    writer: Arc<Mutex<()>>,
}

/// A change to a single document
enum Change {
    Upsert(QueueDocument),
    Remove(String),
}

impl Change {
    fn apply(self, docs: &mut HashMap<String, QueueDocument>) {
        match self {
            Change::Upsert(doc) => {
                docs.insert(doc.queue_id.clone(), doc);
            }
            Change::Remove(queue_id) => {
                docs.remove(&queue_id);
            }
        }
    }
}

impl DocumentCollection {
    /// Collection that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            docs: Arc::new(RwLock::new(HashMap::new())),
            doc_locks: QueueLocks::new(),
            backing: None,
        }
    }

    /// Collection backed by a JSON file, loaded if it already exists
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let docs = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<QueueDocument> = serde_json::from_slice(&bytes)?;
                list.into_iter()
                    .map(|doc| (doc.queue_id.clone(), doc.normalized()))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), documents = docs.len(), "Document collection opened");

        Ok(Self {
            docs: Arc::new(RwLock::new(docs)),
            doc_locks: QueueLocks::new(),
            backing: Some(Backing {
                path,
                writer: Arc::new(Mutex::new(())),
            }),
        })
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Insert a new document. `AppError::Conflict` on a duplicate key.
    pub async fn insert_one(&self, doc: QueueDocument) -> Result<()> {
        let lock = self.doc_locks.acquire(&doc.queue_id).await;
        if self.docs.read().await.contains_key(&doc.queue_id) {
            return Err(AppError::Conflict(format!(
                "Queue {} already exists",
                doc.queue_id
            )));
        }

        self.commit(lock, Change::Upsert(doc)).await
    }

    pub async fn find_one(&self, queue_id: &str) -> Option<QueueDocument> {
        self.docs.read().await.get(queue_id).cloned()
    }

    /// Apply `update` to one document atomically. `None` if no document matched.
    ///
    /// The version is bumped and the change persisted only if the document changed.
    pub async fn update_one<T, F>(&self, queue_id: &str, update: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut QueueDocument) -> T,
    {
        let lock = self.doc_locks.acquire(queue_id).await;
        let Some(original) = self.find_one(queue_id).await else {
            return Ok(None);
        };

        let mut doc = original.clone();
        let result = update(&mut doc);

        if doc != original {
            doc.version = original.version + 1;
            self.commit(lock, Change::Upsert(doc)).await?;
        }

        Ok(Some(result))
    }

    /// Remove a document. `false` if it did not exist.
    pub async fn delete_one(&self, queue_id: &str) -> Result<bool> {
        let lock = self.doc_locks.acquire(queue_id).await;
        if !self.docs.read().await.contains_key(queue_id) {
            return Ok(false);
        }

        self.commit(lock, Change::Remove(queue_id.to_string())).await?;
        Ok(true)
    }

    /// Write the whole collection to its backing file
    pub async fn flush(&self) -> Result<()> {
        let Some(backing) = &self.backing else {
            return Ok(());
        };

        let _writer = backing.writer.lock().await;
        let bytes = render(&*self.docs.read().await, None)?;
        write_file(backing.path.clone(), bytes).await
    }

    /// Make `change` durable, then visible.
    ///
    /// The document lock travels with the commit, so a later writer of the same
    /// document only starts once this change is applied in memory.
    async fn commit(&self, lock: QueueLockGuard, change: Change) -> Result<()> {
        let Some(backing) = self.backing.clone() else {
            change.apply(&mut *self.docs.write().await);
            return Ok(());
        };

        let docs = Arc::clone(&self.docs);
        let task = tokio::spawn(async move {
            let _lock = lock;
            let _writer = backing.writer.lock().await;

            let bytes = render(&*docs.read().await, Some(&change))?;
            write_file(backing.path, bytes).await?;

            change.apply(&mut *docs.write().await);
            Ok::<(), AppError>(())
        });

        task.await
            .map_err(|e| AppError::Internal(format!("Document commit task failed: {}", e)))?
    }
}

/// Serialize the collection as it will look after `pending`
fn render(docs: &HashMap<String, QueueDocument>, pending: Option<&Change>) -> Result<Vec<u8>> {
    let (upsert, remove) = match pending {
        Some(Change::Upsert(doc)) => (Some(doc), None),
        Some(Change::Remove(queue_id)) => (None, Some(queue_id.as_str())),
        None => (None, None),
    };

    let mut list: Vec<&QueueDocument> = docs
        .values()
        .filter(|doc| Some(doc.queue_id.as_str()) != remove)
        .filter(|doc| upsert.map_or(true, |u| u.queue_id != doc.queue_id))
        .collect();
    if let Some(doc) = upsert {
        list.push(doc);
    }
    list.sort_by(|a, b| a.queue_id.cmp(&b.queue_id));

    Ok(serde_json::to_vec_pretty(&list)?)
}

/// Replace `path` with `bytes` through a uniquely named temp file in the same directory
async fn write_file(path: PathBuf, bytes: Vec<u8>) -> Result<()> {
    let target = path.clone();
    let size = bytes.len();

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Internal(format!("Document write task failed: {}", e)))?
    .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", target.display(), e)))?;

    debug!(path = %target.display(), bytes = size, "Collection persisted");
    Ok(())
}
