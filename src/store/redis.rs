use async_trait::async_trait;
use log::error;
use redis::{ AsyncCommands, Client };
use serde_json::Value;
use std::error::Error;

use crate::cli::Args;
use crate::store::{ stamp_write, DocumentStore };

/// Redis-backed document store: one hash per collection, JSON per field.
pub struct RedisDocumentStore {
    client: Client,
    key_prefix: String,
}

impl RedisDocumentStore {
    pub fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Self {
            client: Client::open(args.store_host.as_str())?,
            key_prefix: args.store_redis_prefix.clone(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn collection_key(&self, collection: &str) -> String {
        format!("{}{}", self.key_prefix, collection)
    }
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn get(
        &self,
        collection: &str,
        id: &str
    ) -> Result<Option<Value>, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = conn.hget(self.collection_key(collection), id).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        mut data: Value
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let existing_created_at = self
            .get(collection, id).await?
            .and_then(|doc| doc.get("createdAt").cloned());
        stamp_write(&mut data, existing_created_at);

        let mut conn = self.get_connection().await?;
        let json = serde_json::to_string(&data)?;
        let _: () = conn.hset(self.collection_key(collection), id, json).await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Value
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let Some(mut doc) = self.get(collection, id).await? else {
            return Ok(false);
        };

        if let (Some(target), Value::Object(changes)) = (doc.as_object_mut(), partial) {
            for (key, value) in changes {
                target.insert(key, value);
            }
            target.insert(
                "updatedAt".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339())
            );
        }

        let mut conn = self.get_connection().await?;
        let json = serde_json::to_string(&doc)?;
        let _: () = conn.hset(self.collection_key(collection), id, json).await?;
        Ok(true)
    }

    async fn delete(
        &self,
        collection: &str,
        id: &str
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let removed: i64 = conn.hdel(self.collection_key(collection), id).await?;
        Ok(removed > 0)
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value
    ) -> Result<Vec<Value>, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let entries: Vec<(String, String)> = conn.hgetall(self.collection_key(collection)).await?;
        let mut matches = Vec::new();

        for (id, json) in &entries {
            match serde_json::from_str::<Value>(json) {
                Ok(doc) => {
                    if doc.get(field) == Some(value) {
                        matches.push(doc);
                    }
                }
                Err(e) => {
                    error!("Error parsing document {}/{}: {}", collection, id, e);
                }
            }
        }
        Ok(matches)
    }
}
