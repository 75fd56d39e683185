#![forbid(unsafe_code)]

pub mod document;
pub mod repository;
pub mod sqlite;

pub use document::{DocumentError, StoredBadge, StoredProgressRecord};
pub use repository::{
    DocumentSubscription, InMemoryDocumentStore, InMemoryProgressCache, ProgressCache,
    ProgressDocumentStore, SnapshotEvent, Storage, StorageError,
};
