use progress_core::model::{CourseCatalog, ProgressRecord, UserId};
use progress_core::time::fixed_now;
use storage::repository::ProgressCache;
use storage::sqlite::SqliteProgressCache;
use storage::StoredProgressRecord;

fn user() -> UserId {
    UserId::new("user-1")
}

fn document() -> serde_json::Value {
    let record = ProgressRecord::initial(&CourseCatalog::builtin());
    StoredProgressRecord::from_record(&record, &user(), fixed_now())
        .to_document()
        .expect("encode document")
}

#[tokio::test]
async fn sqlite_cache_round_trips_documents() {
    let cache = SqliteProgressCache::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    cache.migrate().await.expect("migrate");

    assert_eq!(cache.load(&user()).await.unwrap(), None);

    let document = document();
    cache.save(&user(), &document).await.unwrap();
    assert_eq!(cache.load(&user()).await.unwrap(), Some(document.clone()));

    // Saving again overwrites rather than duplicating.
    cache.save(&user(), &document).await.unwrap();
    let parsed =
        StoredProgressRecord::parse(&cache.load(&user()).await.unwrap().unwrap(), &user()).unwrap();
    assert_eq!(parsed.user_id, user());
}

#[tokio::test]
async fn sqlite_cache_clear_is_scoped_to_the_user() {
    let cache = SqliteProgressCache::connect("sqlite:file:memdb_clear?mode=memory&cache=shared")
        .await
        .expect("connect");
    cache.migrate().await.expect("migrate");

    let other = UserId::new("user-2");
    cache.save(&user(), &document()).await.unwrap();
    cache.save(&other, &document()).await.unwrap();

    cache.clear(&user()).await.unwrap();
    assert_eq!(cache.load(&user()).await.unwrap(), None);
    assert!(cache.load(&other).await.unwrap().is_some());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let cache = SqliteProgressCache::connect("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    cache.migrate().await.expect("first migrate");
    cache.migrate().await.expect("second migrate");
}
