//! History store integration tests
//!
//! Every SQL backend must honour the same ordering and isolation rules, so the
//! tests run once per backend through `DatabaseProvider`.

use chrono::{Duration, TimeZone, Utc};
use rstest::rstest;
use std::sync::Arc;
use studybot::db::{ChatStore, DatabaseProvider};
use studybot::types::NewChatTurn;
use tempfile::TempDir;

#[derive(Debug, Clone, Copy)]
enum Backend {
    Memory,
    SqliteFile,
}

/// A fresh store; the temp dir must outlive it for file-backed stores
async fn open(backend: Backend) -> (Arc<dyn ChatStore>, Option<TempDir>) {
    match backend {
        Backend::Memory => (
            DatabaseProvider::Memory
                .create_store()
                .await
                .expect("Failed to create in-memory store"),
            None,
        ),
        Backend::SqliteFile => {
            let dir = TempDir::new().expect("Failed to create temp dir");
            let path = dir.path().join("nested").join("history.db");
            let store = DatabaseProvider::SQLite {
                path: path.to_string_lossy().into_owned(),
            }
            .create_store()
            .await
            .expect("Failed to create sqlite store");
            (store, Some(dir))
        }
    }
}

fn turn_at(user_id: &str, n: i64) -> NewChatTurn {
    let base = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    NewChatTurn {
        user_id: user_id.to_string(),
        user_message: format!("question {}", n),
        bot_response: format!("answer {}", n),
        timestamp: base + Duration::minutes(n),
    }
}

#[rstest]
#[case::memory(Backend::Memory, "memory")]
#[case::sqlite(Backend::SqliteFile, "sqlite")]
#[tokio::test]
async fn test_backend_name_and_ping(#[case] backend: Backend, #[case] name: &str) {
    let (store, _dir) = open(backend).await;
    assert_eq!(store.backend_name(), name);
    assert!(store.ping().await.is_ok());
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::SqliteFile)]
#[tokio::test]
async fn test_recent_turns_window(#[case] backend: Backend) {
    let (store, _dir) = open(backend).await;

    // Inserted out of order; reads are ordered by timestamp
    for n in [4, 1, 6, 2, 5, 3] {
        store.save_turn(&turn_at("izza", n)).await.unwrap();
    }

    let turns = store.recent_turns("izza", 3).await.unwrap();
    let questions: Vec<_> = turns.iter().map(|t| t.user_message.as_str()).collect();
    assert_eq!(questions, ["question 4", "question 5", "question 6"]);

    let all = store.recent_turns("izza", 50).await.unwrap();
    assert_eq!(all.len(), 6);
    assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::SqliteFile)]
#[tokio::test]
async fn test_turn_fields_round_trip(#[case] backend: Backend) {
    let (store, _dir) = open(backend).await;
    let turn = turn_at("izza", 1);

    let id = store.save_turn(&turn).await.unwrap();
    let stored = store.recent_turns("izza", 1).await.unwrap();

    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, id);
    assert_eq!(stored[0].user_id, "izza");
    assert_eq!(stored[0].user_message, "question 1");
    assert_eq!(stored[0].bot_response, "answer 1");
    assert_eq!(stored[0].timestamp, turn.timestamp);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::SqliteFile)]
#[tokio::test]
async fn test_count_and_clear_are_per_user(#[case] backend: Backend) {
    let (store, _dir) = open(backend).await;
    for n in 0..3 {
        store.save_turn(&turn_at("izza", n)).await.unwrap();
    }
    store.save_turn(&turn_at("ana", 0)).await.unwrap();

    assert_eq!(store.count_turns("izza").await.unwrap(), 3);
    assert_eq!(store.count_turns("ana").await.unwrap(), 1);
    assert_eq!(store.count_turns("nobody").await.unwrap(), 0);

    assert_eq!(store.clear_user("izza").await.unwrap(), 3);
    assert_eq!(store.clear_user("izza").await.unwrap(), 0);
    assert!(store.recent_turns("izza", 5).await.unwrap().is_empty());
    assert_eq!(store.recent_turns("ana", 5).await.unwrap().len(), 1);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::SqliteFile)]
#[tokio::test]
async fn test_user_ids_are_exact_matches(#[case] backend: Backend) {
    let (store, _dir) = open(backend).await;
    store.save_turn(&turn_at("Izza", 0)).await.unwrap();
    store.save_turn(&turn_at("izza", 1)).await.unwrap();
    store.save_turn(&turn_at("izza%", 2)).await.unwrap();

    let turns = store.recent_turns("izza", 10).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].user_message, "question 1");
}

#[tokio::test]
async fn test_sqlite_file_survives_reopen() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let provider = DatabaseProvider::SQLite {
        path: dir.path().join("history.db").to_string_lossy().into_owned(),
    };

    {
        let store = provider.create_store().await.unwrap();
        store.save_turn(&turn_at("izza", 1)).await.unwrap();
    }

    let reopened = provider.create_store().await.unwrap();
    let turns = reopened.recent_turns("izza", 5).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].bot_response, "answer 1");
}

// ============= Live MongoDB =============

/// Requires a running server: `MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`
#[cfg(feature = "mongodb")]
#[tokio::test]
#[ignore]
async fn test_mongodb_live_round_trip() {
    let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let collection = format!("chat_history_test_{}", uuid::Uuid::new_v4().simple());
    let store = DatabaseProvider::MongoDB {
        uri,
        database: "study_bot_test".to_string(),
        collection,
    }
    .create_store()
    .await
    .expect("Failed to create MongoDB store");

    store.ping().await.expect("MongoDB is not reachable");
    assert_eq!(store.backend_name(), "mongodb");

    for n in 1..=3 {
        store
            .save_turn(&NewChatTurn::now("izza", &format!("q{}", n), &format!("a{}", n)))
            .await
            .unwrap();
    }

    let turns = store.recent_turns("izza", 2).await.unwrap();
    let questions: Vec<_> = turns.iter().map(|t| t.user_message.as_str()).collect();
    assert_eq!(questions, ["q2", "q3"]);
    assert_eq!(store.count_turns("izza").await.unwrap(), 3);
    assert_eq!(store.clear_user("izza").await.unwrap(), 3);
}
