//! MongoDB history store.

use crate::db::traits::ChatStore;
use crate::types::{AppError, ChatTurn, NewChatTurn, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    options::{ClientOptions, FindOptions},
    Client, Collection,
};
use serde::{Deserialize, Serialize};

/// Chat turns stored one document per turn in a MongoDB collection
pub struct MongoChatStore {
    client: Client,
    collection: Collection<ChatDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    user_id: String,
    user_message: String,
    bot_response: String,
    timestamp: BsonDateTime,
}

impl ChatDocument {
    fn into_turn(self) -> ChatTurn {
        ChatTurn {
            id: self.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: self.user_id,
            user_message: self.user_message,
            bot_response: self.bot_response,
            timestamp: DateTime::from_timestamp_millis(self.timestamp.timestamp_millis())
                .unwrap_or_else(Utc::now),
        }
    }
}

impl MongoChatStore {
    /// Create a store for `database.collection`
    ///
    /// The driver connects lazily, so an unreachable server is reported by
    /// [`ChatStore::ping`] rather than here.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self> {
        let mut client_options = ClientOptions::parse(uri)
            .await
            .map_err(|e| AppError::Database(format!("Failed to parse MongoDB URL: {}", e)))?;
        client_options.app_name = Some("studybot-server".to_string());

        let client = Client::with_options(client_options)
            .map_err(|e| AppError::Database(format!("Failed to create MongoDB client: {}", e)))?;

        let collection = client.database(database).collection(collection);

        Ok(Self { client, collection })
    }
}

#[async_trait]
impl ChatStore for MongoChatStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| AppError::Database(format!("MongoDB ping failed: {}", e)))?;
        Ok(())
    }

    async fn save_turn(&self, turn: &NewChatTurn) -> Result<String> {
        let document = ChatDocument {
            id: None,
            user_id: turn.user_id.clone(),
            user_message: turn.user_message.clone(),
            bot_response: turn.bot_response.clone(),
            timestamp: BsonDateTime::from_millis(turn.timestamp.timestamp_millis()),
        };

        let result = self
            .collection
            .insert_one(document, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to save chat turn: {}", e)))?;

        Ok(result
            .inserted_id
            .as_object_id()
            .map(|id| id.to_hex())
            .unwrap_or_else(|| result.inserted_id.to_string()))
    }

    async fn recent_turns(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        // ObjectIds grow with insertion, so they break timestamp ties
        let options = FindOptions::builder()
            .sort(doc! { "timestamp": -1, "_id": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();

        let mut cursor = self
            .collection
            .find(doc! { "user_id": user_id }, options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to load chat history: {}", e)))?;

        let mut turns = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|e| AppError::Database(format!("Cursor error: {}", e)))?
        {
            let document = cursor
                .deserialize_current()
                .map_err(|e| AppError::Database(format!("Failed to deserialize: {}", e)))?;
            turns.push(document.into_turn());
        }

        turns.reverse();
        Ok(turns)
    }

    async fn count_turns(&self, user_id: &str) -> Result<u64> {
        self.collection
            .count_documents(doc! { "user_id": user_id }, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to count documents: {}", e)))
    }

    async fn clear_user(&self, user_id: &str) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! { "user_id": user_id }, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to clear chat history: {}", e)))?;
        Ok(result.deleted_count)
    }
}
