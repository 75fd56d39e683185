use tokio::sync::watch;

use progress_core::model::UserId;

/// The identity/session provider, specified only at its interface.
///
/// Supplies the current user identifier and a feed of sign-in/sign-out
/// transitions; everything else about authentication lives outside this
/// subsystem.
pub trait AuthProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<UserId>;

    /// A receiver whose value tracks the signed-in user. The receiver's
    /// initial value is the current state.
    fn watch(&self) -> watch::Receiver<Option<UserId>>;
}

/// Auth provider driven by explicit `sign_in`/`sign_out` calls, for tests
/// and embedding hosts that manage identity themselves.
pub struct InMemoryAuthProvider {
    sender: watch::Sender<Option<UserId>>,
}

impl InMemoryAuthProvider {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// The channel must accept the transition even while nobody watches
    /// yet, so a sign-in issued before the gateway starts is not lost.
    pub fn sign_in(&self, user_id: UserId) {
        self.sender.send_replace(Some(user_id));
    }

    pub fn sign_out(&self) {
        self.sender.send_replace(None);
    }
}

impl Default for InMemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for InMemoryAuthProvider {
    fn current_user(&self) -> Option<UserId> {
        self.sender.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<UserId>> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_before_any_watcher_is_not_lost() {
        let auth = InMemoryAuthProvider::new();
        auth.sign_in(UserId::new("user-1"));

        assert_eq!(auth.current_user(), Some(UserId::new("user-1")));
        // A receiver opened after the fact still observes the sign-in.
        let mut rx = auth.watch();
        assert_eq!(*rx.borrow_and_update(), Some(UserId::new("user-1")));

        auth.sign_out();
        assert_eq!(*rx.borrow_and_update(), None);
    }

    #[tokio::test]
    async fn watch_tracks_sign_in_and_out() {
        let auth = InMemoryAuthProvider::new();
        let mut rx = auth.watch();
        assert_eq!(*rx.borrow_and_update(), None);

        auth.sign_in(UserId::new("user-1"));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(UserId::new("user-1")));
        assert_eq!(auth.current_user(), Some(UserId::new("user-1")));

        auth.sign_out();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), None);
    }
}
