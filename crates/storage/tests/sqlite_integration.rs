use std::sync::Arc;

use aula_core::model::{AnswerValue, Answers, EvaluationId, LocalCacheEntry, QuestionId};
use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;
use storage::LocalAttemptCache;

#[tokio::test]
async fn sqlite_key_value_roundtrip() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get("access_token").await.unwrap(), None);

    repo.set("access_token", "first").await.unwrap();
    repo.set("access_token", "second").await.unwrap();
    assert_eq!(
        repo.get("access_token").await.unwrap().as_deref(),
        Some("second")
    );

    repo.remove("access_token").await.unwrap();
    assert_eq!(repo.get("access_token").await.unwrap(), None);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.set("k", "v").await.unwrap();
    repo.migrate().await.expect("second migrate");
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn attempt_cache_survives_on_sqlite() {
    let storage = Storage::sqlite("sqlite:file:memdb_kv_cache?mode=memory&cache=shared")
        .await
        .expect("storage");
    let cache = LocalAttemptCache::new(Arc::clone(&storage.local));
    let evaluation_id = EvaluationId::new(3);

    let mut answers = Answers::new();
    answers.insert(QuestionId::new(1), AnswerValue::from("A"));
    let entry = LocalCacheEntry {
        evaluation_id,
        answers,
        remaining_time: Some(900),
    };

    cache.save(evaluation_id, &entry).await;
    assert_eq!(cache.load(evaluation_id).await, Some(entry));

    cache.clear(evaluation_id).await;
    assert_eq!(cache.load(evaluation_id).await, None);
}
