use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use tokio::sync::RwLock;

use crate::store::{ stamp_write, DocumentStore };

/// In-process document store: collection name -> id -> JSON document.
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(
        &self,
        collection: &str,
        id: &str
    ) -> Result<Option<Value>, Box<dyn Error + Send + Sync>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        mut data: Value
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let existing_created_at = docs
            .get(id)
            .and_then(|doc| doc.get("createdAt"))
            .cloned();
        stamp_write(&mut data, existing_created_at);
        docs.insert(id.to_string(), data);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Value
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id)) else {
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
        Ok(true)
    }

    async fn delete(
        &self,
        collection: &str,
        id: &str
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let mut collections = self.collections.write().await;
        Ok(
            collections
                .get_mut(collection)
                .map(|docs| docs.remove(id).is_some())
                .unwrap_or(false)
        )
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value
    ) -> Result<Vec<Value>, Box<dyn Error + Send + Sync>> {
        let collections = self.collections.read().await;
        let matches = collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| doc.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_round_trips_with_stamps() {
        let store = MemoryDocumentStore::new();
        store.set("users", "u1", json!({ "nombre": "Ana" })).await.unwrap();

        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc["nombre"], "Ana");
        assert!(doc.get("createdAt").is_some());
        assert!(doc.get("updatedAt").is_some());
    }

    #[tokio::test]
    async fn overwrite_preserves_created_at() {
        let store = MemoryDocumentStore::new();
        store.set("users", "u1", json!({ "nombre": "Ana" })).await.unwrap();
        let created = store.get("users", "u1").await.unwrap().unwrap()["createdAt"].clone();

        store.set("users", "u1", json!({ "nombre": "Ana María" })).await.unwrap();
        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc["createdAt"], created);
        assert_eq!(doc["nombre"], "Ana María");
    }

    #[tokio::test]
    async fn update_merges_and_reports_missing_docs() {
        let store = MemoryDocumentStore::new();
        assert!(!store.update("users", "missing", json!({ "a": 1 })).await.unwrap());

        store.set("users", "u1", json!({ "nombre": "Ana", "pais": "Colombia" })).await.unwrap();
        assert!(store.update("users", "u1", json!({ "pais": "España" })).await.unwrap());

        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc["nombre"], "Ana");
        assert_eq!(doc["pais"], "España");
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = MemoryDocumentStore::new();
        store.set("users", "u1", json!({})).await.unwrap();
        assert!(store.delete("users", "u1").await.unwrap());
        assert!(!store.delete("users", "u1").await.unwrap());
        assert!(store.get("users", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_eq_filters_by_field() {
        let store = MemoryDocumentStore::new();
        store.set("checklist", "c1", json!({ "userId": "u1", "title": "a" })).await.unwrap();
        store.set("checklist", "c2", json!({ "userId": "u2", "title": "b" })).await.unwrap();
        store.set("checklist", "c3", json!({ "userId": "u1", "title": "c" })).await.unwrap();

        let mine = store.query_eq("checklist", "userId", &json!("u1")).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|doc| doc["userId"] == "u1"));
    }
}
