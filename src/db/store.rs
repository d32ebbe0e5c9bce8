use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::AppResult;

/// Storage port for flat keyed records
///
/// Repositories serialize their records to strings and hand them to a store; the
/// store knows nothing about their shape. Adapters: [`MemoryStore`] for tests and
/// single-process runs, `RedisStore` for deployments.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn put(&self, key: &str, value: String) -> AppResult<()>;

    /// Returns whether a record was removed
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// Adapter name for logging
    fn name(&self) -> &'static str;
}

/// Process-local store; contents are lost on restart
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> AppResult<()> {
        self.records.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self.records.write().await.remove(key).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.put("k", "v1".to_string()).await.unwrap();
        store.put("k", "v2".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
