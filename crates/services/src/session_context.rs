use std::sync::{Mutex, MutexGuard, PoisonError};

use progress_core::Clock;
use progress_core::model::{CourseCatalog, ProgressRecord, UserId};

use crate::sync_gateway::SyncState;

/// Mutable per-session state shared between the Progress Store and the
/// Sync Gateway.
pub(crate) struct SessionShared {
    pub record: ProgressRecord,
    pub user: Option<UserId>,
    pub loading: bool,
    pub sync: SyncState,
}

/// The per-session context: one instance alive per authenticated session,
/// passed into the stateful components at construction. Replaces any
/// ambient global state.
///
/// The store's UI-triggered mutations and the gateway's snapshot merges
/// both serialize through the inner mutex, which is never held across an
/// await.
pub struct SessionContext {
    clock: Clock,
    catalog: CourseCatalog,
    shared: Mutex<SessionShared>,
}

impl SessionContext {
    #[must_use]
    pub fn new(clock: Clock, catalog: CourseCatalog) -> Self {
        let record = ProgressRecord::initial(&catalog);
        Self {
            clock,
            catalog,
            shared: Mutex::new(SessionShared {
                record,
                user: None,
                // True until the gateway resolves the initial auth state.
                loading: true,
                sync: SyncState::Unbound,
            }),
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn catalog(&self) -> &CourseCatalog {
        &self.catalog
    }

    /// A fresh default record for this context's catalog.
    #[must_use]
    pub fn initial_record(&self) -> ProgressRecord {
        ProgressRecord::initial(&self.catalog)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
