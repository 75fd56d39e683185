//! Shared error types for the services crate.
//!
//! Most of the progress engine's failure modes are deliberately not errors:
//! invalid mutation input and failed persists are logged no-ops (the
//! in-memory record stays the session's source of truth). What remains is
//! bootstrap failure.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
