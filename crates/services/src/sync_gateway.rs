use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use progress_core::model::UserId;
use storage::document::StoredProgressRecord;
use storage::repository::{DocumentSubscription, SnapshotEvent, Storage};

use crate::auth::AuthProvider;
use crate::session_context::SessionContext;

//
// ─── SYNC GATEWAY ──────────────────────────────────────────────────────────────
//

/// Where the gateway stands for the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No user signed in.
    Unbound,
    /// Subscription opened, first snapshot not yet received.
    Hydrating,
    /// Subscription active; the local record reflects at least one remote
    /// snapshot or a freshly initialized default.
    Live,
}

/// A queued write of the full current record, snapshotted at mutation time.
pub struct PersistRequest {
    pub(crate) user_id: UserId,
    pub(crate) document: StoredProgressRecord,
}

/// Bridges the Progress Store to the remote document store and the local
/// durable cache.
///
/// Runs as a single task: auth transitions open and close the per-user
/// subscription, remote snapshots are validated and merged into the
/// in-memory record (remote wins on conflict; last writer wins across
/// sessions), and every local mutation is flushed as a full document.
/// All failures on this path are logged, never surfaced to the learner.
pub struct SyncGateway {
    context: Arc<SessionContext>,
    storage: Storage,
    auth: Arc<dyn AuthProvider>,
    persist_rx: mpsc::UnboundedReceiver<PersistRequest>,
}

struct BoundSession {
    user_id: UserId,
    subscription: DocumentSubscription,
    feed_closed: bool,
}

impl SyncGateway {
    #[must_use]
    pub fn new(
        context: Arc<SessionContext>,
        storage: Storage,
        auth: Arc<dyn AuthProvider>,
        persist_rx: mpsc::UnboundedReceiver<PersistRequest>,
    ) -> Self {
        Self {
            context,
            storage,
            auth,
            persist_rx,
        }
    }

    /// Drive the gateway until the auth feed and the persist queue are both
    /// gone.
    pub async fn run(self) {
        let SyncGateway {
            context,
            storage,
            auth,
            mut persist_rx,
        } = self;
        let mut auth_rx = auth.watch();
        let mut session: Option<BoundSession> = None;

        // Resolve whatever auth state exists at startup, releasing
        // `loading` for the signed-out case.
        let initial = auth_rx.borrow_and_update().clone();
        handle_auth_change(&context, &storage, initial, &mut session).await;

        loop {
            tokio::select! {
                changed = auth_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let user = auth_rx.borrow_and_update().clone();
                    handle_auth_change(&context, &storage, user, &mut session).await;
                }
                event = next_snapshot(&mut session) => {
                    handle_delivery(&context, &storage, event, &mut session).await;
                }
                request = persist_rx.recv() => {
                    let Some(request) = request else { break };
                    persist(&storage, session.as_ref(), request).await;
                }
            }
        }
    }
}

/// The next snapshot for the bound session; pends forever while unbound or
/// after the feed has terminated.
async fn next_snapshot(session: &mut Option<BoundSession>) -> Option<SnapshotEvent> {
    match session {
        Some(bound) if !bound.feed_closed => bound.subscription.next().await,
        _ => std::future::pending().await,
    }
}

async fn handle_auth_change(
    context: &Arc<SessionContext>,
    storage: &Storage,
    user: Option<UserId>,
    session: &mut Option<BoundSession>,
) {
    match user {
        None => {
            // Sign-out clears only the local cache; the remote record stays.
            if let Some(bound) = session.take() {
                debug!(user = %bound.user_id, "signed out; discarding session");
                if let Err(error) = storage.cache.clear(&bound.user_id).await {
                    warn!(%error, "failed to clear local cache on sign-out");
                }
            }
            let mut shared = context.lock();
            shared.user = None;
            shared.record = context.initial_record();
            shared.loading = false;
            shared.sync = SyncState::Unbound;
        }
        Some(user_id) => {
            if session.as_ref().is_some_and(|bound| bound.user_id == user_id) {
                return;
            }
            // Drop any previous user's subscription before rebinding.
            *session = None;
            {
                let mut shared = context.lock();
                shared.user = Some(user_id.clone());
                shared.record = context.initial_record();
                shared.loading = true;
                shared.sync = SyncState::Hydrating;
            }

            // Warm start from the local cache; the first remote snapshot
            // still overrides.
            match storage.cache.load(&user_id).await {
                Ok(Some(document)) => match StoredProgressRecord::parse(&document, &user_id) {
                    Ok(stored) => {
                        let record = stored.merge_into_record(context.catalog());
                        context.lock().record = record;
                    }
                    Err(error) => debug!(%error, "ignoring invalid cached document"),
                },
                Ok(None) => {}
                Err(error) => warn!(%error, "failed to read local cache"),
            }

            let subscription = storage.remote.subscribe(&user_id);
            debug!(user = %user_id, "subscription opened; hydrating");
            *session = Some(BoundSession {
                user_id,
                subscription,
                feed_closed: false,
            });
        }
    }
}

async fn handle_delivery(
    context: &Arc<SessionContext>,
    storage: &Storage,
    event: Option<SnapshotEvent>,
    session: &mut Option<BoundSession>,
) {
    let Some(bound) = session.as_mut() else {
        return;
    };
    let Some(event) = event else {
        // The store dropped the feed; stop waiting, keep the record.
        warn!(user = %bound.user_id, "snapshot feed closed");
        bound.feed_closed = true;
        context.lock().loading = false;
        return;
    };

    // A snapshot that is not for the currently bound user must never be
    // applied, even if it arrives late.
    if event.user_id() != &bound.user_id {
        debug!(user = %event.user_id(), "dropping snapshot for unbound user");
        return;
    }

    match event {
        SnapshotEvent::Error { message, .. } => {
            warn!(user = %bound.user_id, error = %message, "subscription error; presenting current record");
            bound.feed_closed = true;
            context.lock().loading = false;
        }
        SnapshotEvent::Snapshot { document, .. } => {
            apply_snapshot(context, storage, bound, document).await;
        }
    }
}

/// Merge one remote snapshot, or self-heal a missing/invalid document with
/// a fresh default record and an immediate corrective write.
async fn apply_snapshot(
    context: &Arc<SessionContext>,
    storage: &Storage,
    bound: &mut BoundSession,
    document: Option<serde_json::Value>,
) {
    let stored = document.as_ref().and_then(|value| {
        StoredProgressRecord::parse(value, &bound.user_id)
            .inspect_err(|error| warn!(%error, "invalid remote document; reinitializing"))
            .ok()
    });

    match stored {
        Some(stored) => {
            let record = stored.merge_into_record(context.catalog());
            {
                let mut shared = context.lock();
                shared.record = record;
                shared.loading = false;
                shared.sync = SyncState::Live;
            }
            if let Some(value) = document
                && let Err(error) = storage.cache.save(&bound.user_id, &value).await
            {
                warn!(%error, "local cache write failed");
            }
        }
        None => {
            let record = context.initial_record();
            let stored =
                StoredProgressRecord::from_record(&record, &bound.user_id, context.clock().now());
            {
                let mut shared = context.lock();
                shared.record = record;
                shared.loading = false;
                shared.sync = SyncState::Live;
            }
            match stored.to_document() {
                Ok(value) => {
                    if let Err(error) =
                        storage.remote.set(&bound.user_id, value.clone(), false).await
                    {
                        warn!(%error, "corrective write failed");
                    }
                    if let Err(error) = storage.cache.save(&bound.user_id, &value).await {
                        warn!(%error, "local cache write failed");
                    }
                }
                Err(error) => warn!(%error, "cannot encode default progress document"),
            }
        }
    }
}

/// Best-effort flush of one queued mutation. Requests for anyone but the
/// currently bound user are dropped so a late write can never resurrect
/// state after sign-out.
async fn persist(storage: &Storage, session: Option<&BoundSession>, request: PersistRequest) {
    let Some(bound) = session else {
        debug!(user = %request.user_id, "dropping persist for signed-out user");
        return;
    };
    if bound.user_id != request.user_id {
        debug!(user = %request.user_id, "dropping persist for previously bound user");
        return;
    }

    match request.document.to_document() {
        Ok(value) => {
            if let Err(error) = storage.cache.save(&request.user_id, &value).await {
                warn!(%error, "local cache write failed");
            }
            if let Err(error) = storage.remote.set(&request.user_id, value, true).await {
                warn!(%error, "remote persist failed; next write carries the state forward");
            }
        }
        Err(error) => warn!(%error, "cannot encode progress document"),
    }
}
