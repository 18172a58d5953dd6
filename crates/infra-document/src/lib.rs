// Roster Infrastructure - Document Adapter
// Implements: QueueStore over an embedded document collection (one document per queue)

mod collection;
mod document;
mod queue_store;

pub use collection::DocumentCollection;
pub use document::QueueDocument;
pub use queue_store::DocumentQueueStore;
