mod memory;
mod redis;

use async_trait::async_trait;
use log::info;
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;

pub use memory::MemoryDocumentStore;
pub use redis::RedisDocumentStore;

/// Schemaless keyed document storage. Documents are JSON objects;
/// `set` and `update` stamp `createdAt` (first write only) and
/// `updatedAt` with the server clock.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(
        &self,
        collection: &str,
        id: &str
    ) -> Result<Option<Value>, Box<dyn Error + Send + Sync>>;

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Value
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Shallow merge into an existing document. Returns false when the
    /// document does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Value
    ) -> Result<bool, Box<dyn Error + Send + Sync>>;

    async fn delete(
        &self,
        collection: &str,
        id: &str
    ) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// All documents in the collection whose `field` equals `value`.
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value
    ) -> Result<Vec<Value>, Box<dyn Error + Send + Sync>>;
}

/// Applies the server-side write stamps. `existing_created_at` carries
/// the original `createdAt` forward across overwrites.
pub(crate) fn stamp_write(doc: &mut Value, existing_created_at: Option<Value>) {
    if let Value::Object(map) = doc {
        let now = Value::String(chrono::Utc::now().to_rfc3339());
        match existing_created_at {
            Some(created) => {
                map.insert("createdAt".to_string(), created);
            }
            None => {
                map.entry("createdAt".to_string()).or_insert_with(|| now.clone());
            }
        }
        map.insert("updatedAt".to_string(), now);
    }
}

pub fn create_document_store(
    args: &Args
) -> Result<Arc<dyn DocumentStore>, Box<dyn Error + Send + Sync>> {
    match args.store_type.to_lowercase().as_str() {
        "memory" => Ok(Arc::new(MemoryDocumentStore::new())),
        "redis" => {
            let store = RedisDocumentStore::new(args)?;
            Ok(Arc::new(store))
        }
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported document store type: {}", args.store_type)
                    )
                )
            ),
    }
}

pub fn initialize_document_store(
    args: &Args
) -> Result<Arc<dyn DocumentStore>, Box<dyn Error + Send + Sync>> {
    info!("Documents will be stored in: {}", args.store_type);
    create_document_store(args)
}
