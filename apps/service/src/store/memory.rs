use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Store, StoreError};

/// Map-backed store, handy for tests and for embedding the engine
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(String, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(collection: &str, id: &str) -> (String, String) {
        (collection.to_string(), id.to_string())
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound { collection: collection.to_string(), id: id.to_string() }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let key = Self::key(collection, id);
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        self.records
            .read()
            .await
            .get(&Self::key(collection, id))
            .cloned()
            .ok_or_else(|| Self::not_found(collection, id))
    }

    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        match self.records.write().await.get_mut(&Self::key(collection, id)) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(Self::not_found(collection, id)),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .remove(&Self::key(collection, id))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(collection, id))
    }

    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .keys()
            .filter(|(c, _)| c == collection)
            .map(|(_, id)| id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_collections_are_separate() {
        let store = MemoryStore::new();
        store.create("checks", "x", &json!(1)).await.unwrap();
        store.create("users", "x", &json!(2)).await.unwrap();

        assert_eq!(store.list("checks").await.unwrap(), vec!["x"]);
        assert_eq!(store.read("users", "x").await.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn test_update_and_delete_need_existing_record() {
        let store = MemoryStore::new();
        assert!(store.update("checks", "x", &json!(1)).await.is_err());
        assert!(store.delete("checks", "x").await.is_err());
    }
}
