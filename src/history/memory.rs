use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use tokio::sync::RwLock;

use crate::history::HistoryStore;
use crate::models::chat::{ ChatMessage, Conversation, Role };

/// In-process history store. The default for development and tests;
/// conversations vanish on restart.
pub struct MemoryHistoryStore {
    conversations: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
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

        let mut conversations = self.conversations.write().await;
        conversations
            .entry(conversation_id.to_string())
            .or_default()
            .push(ChatMessage::new(role, content));
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
        limit: usize
    ) -> Result<Conversation, Box<dyn Error + Send + Sync>> {
        let conversations = self.conversations.read().await;
        let messages = conversations
            .get(conversation_id)
            .map(|msgs| {
                let start = msgs.len().saturating_sub(limit);
                msgs[start..].to_vec()
            })
            .unwrap_or_default();

        Ok(Conversation {
            id: conversation_id.to_string(),
            thread_id: Some(conversation_id.to_string()),
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_and_reads_back_in_order() {
        let store = MemoryHistoryStore::new();
        store.add_message("t1", "user", "hola").await.unwrap();
        store.add_message("t1", "assistant", "buenas").await.unwrap();

        let convo = store.get_conversation("t1", 10).await.unwrap();
        assert_eq!(convo.messages.len(), 2);
        assert_eq!(convo.messages[0].role, Role::User);
        assert_eq!(convo.messages[1].content, "buenas");
    }

    #[tokio::test]
    async fn limit_keeps_most_recent_messages() {
        let store = MemoryHistoryStore::new();
        for i in 0..5 {
            store.add_message("t1", "user", &format!("m{}", i)).await.unwrap();
        }
        let convo = store.get_conversation("t1", 2).await.unwrap();
        assert_eq!(convo.messages.len(), 2);
        assert_eq!(convo.messages[0].content, "m3");
        assert_eq!(convo.messages[1].content, "m4");
    }

    #[tokio::test]
    async fn unknown_conversation_is_empty() {
        let store = MemoryHistoryStore::new();
        let convo = store.get_conversation("missing", 10).await.unwrap();
        assert!(convo.messages.is_empty());
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let store = MemoryHistoryStore::new();
        assert!(store.add_message("t1", "system", "x").await.is_err());
    }
}
