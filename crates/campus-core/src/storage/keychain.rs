use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::{run_blocking, validate_key, SecurePersistence, StorageError};

const SERVICE_NAME: &str = "campus-session";

/// Key read by `check_available`; never written.
const AVAILABILITY_KEY: &str = "availabilityCheck";

/// Values stored in the OS keychain, one entry per key under a shared
/// service name.
///
/// Entries are created once per key and reused, so every call for a key
/// goes through the same credential handle.
pub struct KeychainStore {
    service: String,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl KeychainStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fails if the platform has no usable credential store (e.g. no secret
    /// service running on a headless Linux box).
    pub async fn check_available(&self) -> Result<(), StorageError> {
        self.get(AVAILABILITY_KEY).await.map(|_| ())
    }

    fn entry(&self, key: &str) -> Result<Arc<Entry>, StorageError> {
        validate_key(key)?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Keychain("Keyring entry cache poisoned".to_string()))?;

        if let Some(entry) = entries.get(key) {
            return Ok(entry.clone());
        }
        let entry = Arc::new(Entry::new(&self.service, key).map_err(|e| {
            StorageError::Keychain(format!("Failed to create keyring entry: {}", e))
        })?);
        entries.insert(key.to_string(), entry.clone());
        Ok(entry)
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecurePersistence for KeychainStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entry = self.entry(key)?;
        run_blocking(move || match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Keychain(format!(
                "Failed to retrieve value from keychain: {}",
                e
            ))),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let entry = self.entry(key)?;
        let value = value.to_string();
        run_blocking(move || {
            entry
                .set_password(&value)
                .map_err(|e| StorageError::Keychain(format!("Failed to store value in keychain: {}", e)))
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let entry = self.entry(key)?;
        let key = key.to_string();
        run_blocking(move || match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => {
                debug!(key = %key, "Keychain entry already absent");
                Ok(())
            }
            Err(e) => Err(StorageError::Keychain(format!(
                "Failed to delete credential from keychain: {}",
                e
            ))),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests run against keyring's in-process mock so they don't touch the
    // developer's real keychain.
    fn mock_store() -> KeychainStore {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        KeychainStore::with_service("campus-session-test")
    }

    #[tokio::test]
    async fn test_missing_entry_reads_as_none() {
        let store = mock_store();
        assert_eq!(store.get("neverSet").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_entry_is_ok() {
        let store = mock_store();
        assert!(store.delete("neverSet").await.is_ok());
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let store = mock_store();

        store.set("userToken", r#"{"identifier":"a@b.c"}"#).await.unwrap();
        assert_eq!(
            store.get("userToken").await.unwrap().as_deref(),
            Some(r#"{"identifier":"a@b.c"}"#)
        );

        store.set("userToken", "replaced").await.unwrap();
        assert_eq!(store.get("userToken").await.unwrap().as_deref(), Some("replaced"));

        store.delete("userToken").await.unwrap();
        assert_eq!(store.get("userToken").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mock_store_is_available() {
        assert!(mock_store().check_available().await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_invalid_key() {
        let store = mock_store();
        let err = store.get("bad key").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
