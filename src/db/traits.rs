//! History store abstraction
//!
//! This module provides the `ChatStore` trait that abstracts over the backends
//! a conversation history can live in (MongoDB, in-memory SQLite, file-based
//! SQLite, remote Turso).
//!
//! # Example
//!
//! ```rust,ignore
//! use studybot::db::{ChatStore, DatabaseProvider};
//!
//! // Use in-memory database (default for development/testing)
//! let store = DatabaseProvider::Memory.create_store().await?;
//!
//! // Use file-based SQLite
//! let store = DatabaseProvider::SQLite { path: "data/studybot.db".into() }.create_store().await?;
//!
//! // Use MongoDB (requires `mongodb` feature)
//! let store = DatabaseProvider::MongoDB { uri, database, collection }.create_store().await?;
//! ```

use crate::types::{AppError, ChatTurn, NewChatTurn, Result};
use crate::utils::toml_config::{DatabaseBackend, StudyBotConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence for question/answer turns, keyed by user
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Short backend identifier reported by `/health` (e.g. `"mongodb"`)
    fn backend_name(&self) -> &'static str;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<()>;

    /// Persist a turn and return its id
    async fn save_turn(&self, turn: &NewChatTurn) -> Result<String>;

    /// The newest `limit` turns of a user, ordered oldest first
    ///
    /// Turns with equal timestamps keep their insertion order.
    async fn recent_turns(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>>;

    /// Number of stored turns for a user
    async fn count_turns(&self, user_id: &str) -> Result<u64>;

    /// Delete every turn of a user, returning how many were removed
    async fn clear_user(&self, user_id: &str) -> Result<u64>;
}

/// History backend selection
#[derive(Debug, Clone, Default)]
pub enum DatabaseProvider {
    /// In-memory SQLite database (ephemeral, lost on restart)
    #[default]
    Memory,
    /// File-based SQLite database
    SQLite {
        /// Path to the SQLite database file
        path: String,
    },
    /// Remote Turso database (requires network access)
    Turso {
        /// The Turso database URL (e.g., `libsql://your-db.turso.io`)
        url: String,
        /// Authentication token for the Turso database
        auth_token: String,
    },
    /// MongoDB collection
    #[cfg(feature = "mongodb")]
    MongoDB {
        /// Connection string (`mongodb://` or `mongodb+srv://`)
        uri: String,
        database: String,
        collection: String,
    },
}

impl DatabaseProvider {
    /// Create a history store from this provider configuration
    pub async fn create_store(&self) -> Result<Arc<dyn ChatStore>> {
        match self {
            DatabaseProvider::Memory => {
                let client = super::turso::TursoClient::new_memory().await?;
                Ok(Arc::new(client))
            }
            DatabaseProvider::SQLite { path } => {
                let client = super::turso::TursoClient::new_local(path).await?;
                Ok(Arc::new(client))
            }
            DatabaseProvider::Turso { url, auth_token } => {
                let client =
                    super::turso::TursoClient::new_remote(url.clone(), auth_token.clone()).await?;
                Ok(Arc::new(client))
            }
            #[cfg(feature = "mongodb")]
            DatabaseProvider::MongoDB {
                uri,
                database,
                collection,
            } => {
                let store = super::mongo::MongoChatStore::connect(uri, database, collection).await?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Build the provider described by the `[database]` section
    ///
    /// Connection strings and tokens are read from the environment variables
    /// the section names.
    pub fn from_config(config: &StudyBotConfig) -> Result<Self> {
        let db = &config.database;
        match db.backend {
            DatabaseBackend::Memory => Ok(DatabaseProvider::Memory),
            DatabaseBackend::SQLite => {
                if db.url == ":memory:" {
                    Ok(DatabaseProvider::Memory)
                } else {
                    Ok(DatabaseProvider::SQLite {
                        path: db.url.clone(),
                    })
                }
            }
            DatabaseBackend::Turso => {
                let read = |env: &Option<String>, what: &str| -> Result<String> {
                    env.as_deref()
                        .and_then(|name| config.resolve_env(name))
                        .ok_or_else(|| {
                            AppError::Configuration(format!("Turso {} is not configured", what))
                        })
                };
                Ok(DatabaseProvider::Turso {
                    url: read(&db.turso_url_env, "URL")?,
                    auth_token: read(&db.turso_token_env, "auth token")?,
                })
            }
            #[cfg(feature = "mongodb")]
            DatabaseBackend::MongoDB => Ok(DatabaseProvider::MongoDB {
                uri: config
                    .mongodb_uri()
                    .map_err(|e| AppError::Configuration(e.to_string()))?,
                database: db.mongodb_database.clone(),
                collection: db.mongodb_collection.clone(),
            }),
            #[cfg(not(feature = "mongodb"))]
            DatabaseBackend::MongoDB => Err(AppError::Configuration(
                "MongoDB backend requires the 'mongodb' feature".to_string(),
            )),
        }
    }

    /// Create from environment variables or use defaults
    pub fn from_env() -> Self {
        #[cfg(feature = "mongodb")]
        {
            if let Ok(uri) = std::env::var("MONGODB_URI") {
                if !uri.trim().is_empty() {
                    return DatabaseProvider::MongoDB {
                        uri,
                        database: "study_bot".to_string(),
                        collection: "chat_history".to_string(),
                    };
                }
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            if !path.is_empty() && path != ":memory:" {
                return DatabaseProvider::SQLite { path };
            }
        }

        DatabaseProvider::Memory
    }
}
