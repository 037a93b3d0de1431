use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{SecurePersistence, StorageError};

/// Process-local store. Nothing survives a restart, so it is only useful
/// for tests and `--ephemeral` runs.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store, e.g. to simulate a previous app run.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut values = HashMap::new();
        values.insert(key.into(), value.into());
        Self {
            values: Mutex::new(values),
        }
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.values.lock().await.contains_key(key)
    }
}

#[async_trait]
impl SecurePersistence for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("userToken").await.unwrap(), None);

        store.set("userToken", "one").await.unwrap();
        store.set("userToken", "two").await.unwrap();
        assert_eq!(store.get("userToken").await.unwrap().as_deref(), Some("two"));

        store.delete("userToken").await.unwrap();
        store.delete("userToken").await.unwrap();
        assert!(!store.contains_key("userToken").await);
    }
}
