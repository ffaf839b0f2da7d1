use crate::db::traits::ChatStore;
use crate::types::{AppError, ChatTurn, NewChatTurn, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database};
use std::path::Path;

/// libsql-backed history store (in-memory, local file or remote Turso)
///
/// One connection is opened up front and shared; an in-memory database only
/// lives as long as the connection that created it.
pub struct TursoClient {
    _db: Database,
    conn: Connection,
    kind: &'static str,
}

impl TursoClient {
    /// Connect to a remote Turso database
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Turso: {}", e)))?;

        Self::from_database(db, "turso").await
    }

    /// Open (or create) a local SQLite file
    pub async fn new_local(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Database(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open {}: {}", path, e)))?;

        Self::from_database(db, "sqlite").await
    }

    /// Ephemeral in-memory database, used for tests and the `memory` backend
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open in-memory database: {}", e)))?;

        Self::from_database(db, "memory").await
    }

    async fn from_database(db: Database, kind: &'static str) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self {
            _db: db,
            conn,
            kind,
        };
        client.initialize_schema().await?;

        Ok(client)
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS chat_history (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    user_message TEXT NOT NULL,
                    bot_response TEXT NOT NULL,
                    timestamp INTEGER NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to create chat_history table: {}", e))
            })?;

        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_chat_history_user_time
                 ON chat_history (user_id, timestamp)",
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create history index: {}", e)))?;

        Ok(())
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| AppError::Database(format!("Invalid stored timestamp: {}", millis)))
}

#[async_trait]
impl ChatStore for TursoClient {
    fn backend_name(&self) -> &'static str {
        self.kind
    }

    async fn ping(&self) -> Result<()> {
        self.conn
            .query("SELECT 1", ())
            .await
            .map_err(|e| AppError::Database(format!("Database ping failed: {}", e)))?;
        Ok(())
    }

    async fn save_turn(&self, turn: &NewChatTurn) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();

        self.conn
            .execute(
                "INSERT INTO chat_history (id, user_id, user_message, bot_response, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    id.as_str(),
                    turn.user_id.as_str(),
                    turn.user_message.as_str(),
                    turn.bot_response.as_str(),
                    turn.timestamp.timestamp_millis(),
                ),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to save chat turn: {}", e)))?;

        Ok(id)
    }

    async fn recent_turns(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, user_message, bot_response, timestamp
                 FROM chat_history
                 WHERE user_id = ?1
                 ORDER BY timestamp DESC, rowid DESC
                 LIMIT ?2",
                (user_id, limit),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to load chat history: {}", e)))?;

        let mut turns = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            turns.push(ChatTurn {
                id: row
                    .get::<String>(0)
                    .map_err(|e| AppError::Database(e.to_string()))?,
                user_id: row
                    .get::<String>(1)
                    .map_err(|e| AppError::Database(e.to_string()))?,
                user_message: row
                    .get::<String>(2)
                    .map_err(|e| AppError::Database(e.to_string()))?,
                bot_response: row
                    .get::<String>(3)
                    .map_err(|e| AppError::Database(e.to_string()))?,
                timestamp: from_millis(
                    row.get::<i64>(4)
                        .map_err(|e| AppError::Database(e.to_string()))?,
                )?,
            });
        }

        // Newest first from the query, callers want reading order
        turns.reverse();
        Ok(turns)
    }

    async fn count_turns(&self, user_id: &str) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM chat_history WHERE user_id = ?1",
                [user_id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to count chat history: {}", e)))?;

        let count = match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => row
                .get::<i64>(0)
                .map_err(|e| AppError::Database(e.to_string()))?,
            None => 0,
        };

        Ok(count.max(0) as u64)
    }

    async fn clear_user(&self, user_id: &str) -> Result<u64> {
        self.conn
            .execute("DELETE FROM chat_history WHERE user_id = ?1", [user_id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to clear chat history: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn turn_at(user: &str, n: usize, timestamp: DateTime<Utc>) -> NewChatTurn {
        NewChatTurn {
            user_id: user.to_string(),
            user_message: format!("q{}", n),
            bot_response: format!("a{}", n),
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_schema_and_ping() {
        let client = TursoClient::new_memory().await.unwrap();
        assert_eq!(client.backend_name(), "memory");
        client.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_recent_turns_newest_n_oldest_first() {
        let client = TursoClient::new_memory().await.unwrap();
        let start = Utc::now();
        for n in 0..8 {
            client
                .save_turn(&turn_at("ana", n, start + Duration::seconds(n as i64)))
                .await
                .unwrap();
        }

        let turns = client.recent_turns("ana", 3).await.unwrap();
        let questions: Vec<_> = turns.iter().map(|t| t.user_message.as_str()).collect();
        assert_eq!(questions, vec!["q5", "q6", "q7"]);
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_insertion_order() {
        let client = TursoClient::new_memory().await.unwrap();
        let now = Utc::now();
        for n in 0..4 {
            client.save_turn(&turn_at("ben", n, now)).await.unwrap();
        }

        let turns = client.recent_turns("ben", 2).await.unwrap();
        assert_eq!(turns[0].user_message, "q2");
        assert_eq!(turns[1].user_message, "q3");
    }

    #[tokio::test]
    async fn test_users_are_isolated_and_cleared() {
        let client = TursoClient::new_memory().await.unwrap();
        let now = Utc::now();
        client.save_turn(&turn_at("ana", 1, now)).await.unwrap();
        client.save_turn(&turn_at("ana", 2, now)).await.unwrap();
        client.save_turn(&turn_at("ben", 1, now)).await.unwrap();

        assert_eq!(client.count_turns("ana").await.unwrap(), 2);
        assert!(client
            .recent_turns("ben", 10)
            .await
            .unwrap()
            .iter()
            .all(|t| t.user_id == "ben"));

        assert_eq!(client.clear_user("ana").await.unwrap(), 2);
        assert_eq!(client.count_turns("ana").await.unwrap(), 0);
        assert_eq!(client.count_turns("ben").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_timestamp_round_trips_to_millis() {
        let client = TursoClient::new_memory().await.unwrap();
        let ts = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        client.save_turn(&turn_at("cy", 1, ts)).await.unwrap();

        let turns = client.recent_turns("cy", 1).await.unwrap();
        assert_eq!(turns[0].timestamp, ts);
    }

    #[tokio::test]
    async fn test_local_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");
        let path = path.to_str().unwrap().to_string();

        {
            let client = TursoClient::new_local(&path).await.unwrap();
            assert_eq!(client.backend_name(), "sqlite");
            client
                .save_turn(&turn_at("dee", 1, Utc::now()))
                .await
                .unwrap();
        }

        let reopened = TursoClient::new_local(&path).await.unwrap();
        assert_eq!(reopened.count_turns("dee").await.unwrap(), 1);
    }
}
