use std::sync::Arc;

use tokio::sync::mpsc;

use progress_core::Clock;
use progress_core::model::CourseCatalog;
use storage::repository::{ProgressDocumentStore, Storage};

use crate::auth::AuthProvider;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::session_context::SessionContext;
use crate::sync_gateway::SyncGateway;

/// Assembles the progress engine for one session: a shared context, the
/// Progress Store, and a running Sync Gateway task.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
    context: Arc<SessionContext>,
}

impl AppServices {
    /// Wire the engine over the given storage and identity provider.
    ///
    /// Must be called within a Tokio runtime: the Sync Gateway is spawned
    /// as a background task that lives as long as the auth feed and the
    /// returned services.
    #[must_use]
    pub fn new(storage: Storage, auth: Arc<dyn AuthProvider>, clock: Clock) -> Self {
        let context = Arc::new(SessionContext::new(clock, CourseCatalog::builtin()));
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        let progress = Arc::new(ProgressService::new(Arc::clone(&context), persist_tx));
        let gateway = SyncGateway::new(Arc::clone(&context), storage, auth, persist_rx);
        tokio::spawn(gateway.run());
        Self { progress, context }
    }

    /// Build services with a `SQLite` local cache in front of the given
    /// remote store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if cache initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        remote: Arc<dyn ProgressDocumentStore>,
        auth: Arc<dyn AuthProvider>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::with_sqlite_cache(db_url, remote).await?;
        Ok(Self::new(storage, auth, clock))
    }

    /// Fully in-memory wiring for tests and prototyping.
    #[must_use]
    pub fn in_memory(auth: Arc<dyn AuthProvider>, clock: Clock) -> Self {
        Self::new(Storage::in_memory(), auth, clock)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn context(&self) -> Arc<SessionContext> {
        Arc::clone(&self.context)
    }
}
