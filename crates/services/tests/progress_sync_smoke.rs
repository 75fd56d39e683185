//! End-to-end exercises of the assembled engine: auth transitions drive
//! hydration, mutations flow out to the remote store, and sign-out leaves
//! nothing behind locally.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use progress_core::model::{BadgeIcon, BadgeId, UserId};
use progress_core::time::{fixed_clock, fixed_now};
use services::{AppServices, AuthProvider, InMemoryAuthProvider, SyncState};
use storage::repository::{
    InMemoryDocumentStore, InMemoryProgressCache, ProgressCache, ProgressDocumentStore, Storage,
};

struct Harness {
    services: AppServices,
    auth: Arc<InMemoryAuthProvider>,
    remote: InMemoryDocumentStore,
    cache: InMemoryProgressCache,
}

fn harness() -> Harness {
    let remote = InMemoryDocumentStore::new();
    let cache = InMemoryProgressCache::new();
    let storage = Storage {
        remote: Arc::new(remote.clone()),
        cache: Arc::new(cache.clone()),
    };
    let auth = Arc::new(InMemoryAuthProvider::new());
    let services = AppServices::new(
        storage,
        Arc::clone(&auth) as Arc<dyn AuthProvider>,
        fixed_clock(),
    );
    Harness {
        services,
        auth,
        remote,
        cache,
    }
}

/// Poll until the gateway task catches up; panics if it never does.
async fn wait_until(description: &str, mut condition: impl AsyncFnMut() -> bool) {
    let poll = async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), poll)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for: {description}"));
}

async fn remote_document(h: &Harness, user: &UserId) -> serde_json::Value {
    wait_until("remote document to appear", async || {
        h.remote.get(user).await.unwrap().is_some()
    })
    .await;
    h.remote.get(user).await.unwrap().unwrap()
}

async fn sign_in_and_hydrate(h: &Harness, user: &str) {
    h.auth.sign_in(UserId::new(user));
    let progress = h.services.progress();
    wait_until("hydration to finish", async || {
        !progress.loading() && progress.sync_state() == SyncState::Live
    })
    .await;
}

#[tokio::test]
async fn first_sign_in_self_heals_a_missing_remote_document() {
    let h = harness();
    let user = UserId::new("user-1");
    sign_in_and_hydrate(&h, "user-1").await;

    let progress = h.services.progress();
    assert!(progress.is_authenticated());
    assert_eq!(progress.total_progress(), 0.0);
    assert!(progress.recent_activities().is_empty());
    assert_eq!(progress.badges().len(), 8);

    // The corrective write lands a full default document remotely and in
    // the local cache.
    let document = remote_document(&h, &user).await;
    assert_eq!(document["userId"], "user-1");
    assert!(document["scrollProgress"].as_object().unwrap().is_empty());
    assert_eq!(document["badges"]["quick-learner"]["unlocked"], false);
    wait_until("cache warm copy", async || {
        h.cache.load(&user).await.unwrap().is_some()
    })
    .await;
}

#[tokio::test]
async fn quiz_answers_flow_out_to_the_remote_store() {
    let h = harness();
    let user = UserId::new("user-1");
    sign_in_and_hydrate(&h, "user-1").await;

    let progress = h.services.progress();
    progress.update_quiz_progress("math-beg-formula-rearrangement", "q1", true);
    progress.update_quiz_progress("math-beg-formula-rearrangement", "q2", false);

    let got = progress.section_progress("math-beg-formula-rearrangement");
    assert!((got - 70.0).abs() < 1e-9, "expected 70, got {got}");

    wait_until("quiz answers to persist", async || {
        h.remote
            .get(&user)
            .await
            .unwrap()
            .is_some_and(|doc| doc["quizProgress"].as_object().unwrap().len() == 2)
    })
    .await;
    let document = h.remote.get(&user).await.unwrap().unwrap();
    assert_eq!(
        document["quizProgress"]["math-beg-formula-rearrangement-q1"]["correct"],
        true
    );
}

#[tokio::test]
async fn earned_badges_reach_the_remote_document() {
    let h = harness();
    let user = UserId::new("user-1");
    sign_in_and_hydrate(&h, "user-1").await;

    let progress = h.services.progress();
    for i in 0..5 {
        progress.mark_lesson_complete("math-beg", &format!("lesson-{i}"));
    }
    assert!(progress.badges()[&BadgeId::new("quick-learner")].unlocked);

    wait_until("badge unlock to persist", async || {
        h.remote
            .get(&user)
            .await
            .unwrap()
            .is_some_and(|doc| doc["badges"]["quick-learner"]["unlocked"] == true)
    })
    .await;
}

#[tokio::test]
async fn sign_out_resets_local_state_and_clears_the_cache() {
    let h = harness();
    let user = UserId::new("user-1");
    sign_in_and_hydrate(&h, "user-1").await;

    let progress = h.services.progress();
    progress.update_scroll_progress("math-beg", 50.0);
    wait_until("scroll progress to persist", async || {
        h.remote
            .get(&user)
            .await
            .unwrap()
            .is_some_and(|doc| doc["scrollProgress"]["math-beg"] == 50.0)
    })
    .await;

    h.auth.sign_out();
    wait_until("sign-out to land", async || !progress.is_authenticated()).await;

    assert_eq!(progress.course_progress("math-beg"), 0.0);
    assert!(!progress.loading());
    assert_eq!(progress.sync_state(), SyncState::Unbound);
    wait_until("cache to be cleared", async || {
        h.cache.load(&user).await.unwrap().is_none()
    })
    .await;
    // The remote record survives sign-out.
    assert!(h.remote.get(&user).await.unwrap().is_some());
}

#[tokio::test]
async fn switching_users_never_leaks_state_across_accounts() {
    let h = harness();
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");

    sign_in_and_hydrate(&h, "alice").await;
    let progress = h.services.progress();
    progress.update_quiz_progress("math-beg-fractions", "q1", true);
    wait_until("alice's answer to persist", async || {
        h.remote
            .get(&alice)
            .await
            .unwrap()
            .is_some_and(|doc| !doc["quizProgress"].as_object().unwrap().is_empty())
    })
    .await;

    h.auth.sign_out();
    wait_until("sign-out to land", async || !progress.is_authenticated()).await;

    sign_in_and_hydrate(&h, "bob").await;
    assert_eq!(progress.course_progress("math-beg"), 0.0);
    assert!(progress.recent_activities().is_empty());

    let bob_doc = remote_document(&h, &bob).await;
    assert_eq!(bob_doc["userId"], "bob");
    assert!(bob_doc["quizProgress"].as_object().unwrap().is_empty());

    // Alice's record is untouched by Bob's session.
    let alice_doc = h.remote.get(&alice).await.unwrap().unwrap();
    assert_eq!(alice_doc["userId"], "alice");
    assert!(!alice_doc["quizProgress"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn older_remote_documents_gain_new_badges_and_keep_unknown_ones() {
    let h = harness();
    let user = UserId::new("user-1");

    // A document written by an older release: one catalog badge with a
    // stale title, one badge the catalog no longer knows, no others.
    let seeded = json!({
        "scrollProgress": { "math-beg": 42.0 },
        "quizProgress": {},
        "lessonProgress": {},
        "badges": {
            "perfect-score": {
                "id": "perfect-score",
                "title": "Stale Title",
                "description": "Stale description",
                "unlocked": true,
                "unlockedAt": fixed_now(),
                "progress": 100.0,
                "iconName": "trophy"
            },
            "legacy-badge": {
                "id": "legacy-badge",
                "title": "Legacy",
                "description": "From a previous release",
                "unlocked": true,
                "progress": 100.0,
                "iconName": "hologram"
            }
        },
        "recentActivities": [],
        "lastUpdated": fixed_now(),
        "userId": "user-1"
    });
    h.remote.set(&user, seeded, false).await.unwrap();

    sign_in_and_hydrate(&h, "user-1").await;
    let progress = h.services.progress();

    // Scroll-only course progress comes straight from the stored map.
    assert_eq!(progress.course_progress("math-beg"), 42.0);

    let badges = progress.badges();
    assert_eq!(badges.len(), 9);
    // Unlock state is stored data; title and icon come from code.
    let perfect = &badges[&BadgeId::new("perfect-score")];
    assert!(perfect.unlocked);
    assert_eq!(perfect.title, "Perfect Score");
    // Catalog badges missing from the document arrive locked.
    assert!(!badges[&BadgeId::new("quick-learner")].unlocked);
    // Unknown stored badges survive with the fallback icon.
    let legacy = &badges[&BadgeId::new("legacy-badge")];
    assert!(legacy.unlocked);
    assert_eq!(legacy.icon, BadgeIcon::Medal);
}

#[tokio::test]
async fn rejected_remote_writes_keep_local_state_until_the_next_flush() {
    let h = harness();
    let user = UserId::new("user-1");
    sign_in_and_hydrate(&h, "user-1").await;
    remote_document(&h, &user).await;

    h.remote.set_fail_writes(true);
    let progress = h.services.progress();
    progress.update_scroll_progress("math-beg", 60.0);
    assert_eq!(progress.course_progress("math-beg"), 60.0);

    // Give the gateway time to attempt (and drop) the flush.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let document = h.remote.get(&user).await.unwrap().unwrap();
    assert!(document["scrollProgress"].as_object().unwrap().is_empty());
    assert!(!progress.loading());

    // The next successful write carries the full state forward.
    h.remote.set_fail_writes(false);
    progress.update_scroll_progress("math-beg", 61.0);
    wait_until("full state to flush", async || {
        h.remote
            .get(&user)
            .await
            .unwrap()
            .is_some_and(|doc| doc["scrollProgress"]["math-beg"] == 61.0)
    })
    .await;
}
