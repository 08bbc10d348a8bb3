use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use log::error;
use redis::{ AsyncCommands, Client };
use serde::{ Serialize, Deserialize };
use std::error::Error;
use uuid::Uuid;

use crate::cli::Args;
use crate::history::HistoryStore;
use crate::models::chat::{ ChatMessage, Conversation, Role };

#[derive(Serialize, Deserialize)]
struct StoredMessage {
    id: Uuid,
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

/// Redis-backed history: one list per conversation, newest entry first
/// (LPUSH), JSON per entry.
pub struct RedisHistoryStore {
    client: Client,
    key_prefix: String,
}

impl RedisHistoryStore {
    pub fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Self {
            client: Client::open(args.history_host.as_str())?,
            key_prefix: args.history_redis_prefix.clone(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn add_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let role = match role {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            other => {
                return Err(format!("Unknown message role: {}", other).into());
            }
        };

        let mut conn = self.get_connection().await?;
        let key = format!("{}{}", self.key_prefix, conversation_id);

        let message = StoredMessage {
            id: Uuid::new_v4(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        let json_msg = serde_json::to_string(&message)?;
        let _: i64 = conn.lpush(&key, &json_msg).await?;
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
        limit: usize
    ) -> Result<Conversation, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let key = format!("{}{}", self.key_prefix, conversation_id);
        let json_entries: Vec<String> = conn.lrange(&key, 0, (limit as isize) - 1).await?;
        let mut messages = Vec::new();

        for json_entry in &json_entries {
            match serde_json::from_str::<StoredMessage>(json_entry) {
                Ok(msg) => {
                    messages.push(ChatMessage {
                        id: msg.id,
                        role: msg.role,
                        content: msg.content,
                        created_at: msg.created_at,
                    });
                }
                Err(e) => {
                    error!("Error parsing history entry: {}", e);
                }
            }
        }
        messages.reverse();

        Ok(Conversation {
            id: conversation_id.to_string(),
            thread_id: Some(conversation_id.to_string()),
            messages,
        })
    }
}
