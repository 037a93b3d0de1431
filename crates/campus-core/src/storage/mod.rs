//! Secure on-device persistence for the session blob.
//!
//! This module provides:
//! - `SecurePersistence`: the async key-value seam the session manager writes through
//! - `KeychainStore`: OS-level credential storage via keyring
//! - `EncryptedFileStore`: passphrase-sealed files for devices without a keychain
//! - `MemoryStore`: process-local storage for tests and ephemeral runs

pub mod encrypted_file;
pub mod keychain;
pub mod memory;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub use encrypted_file::EncryptedFileStore;
pub use keychain::KeychainStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Encryption error: {0}")]
    Crypto(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("A passphrase is required for encrypted file storage")]
    MissingPassphrase,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Key-value store with encrypted-at-rest semantics.
#[async_trait]
pub trait SecurePersistence: Send + Sync {
    /// Raw stored value, or `None` if the key was never set.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the value under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Which `SecurePersistence` implementation the app runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Keychain,
    EncryptedFile,
    Memory,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keychain" | "keyring" => Some(StorageBackend::Keychain),
            "encrypted_file" | "file" => Some(StorageBackend::EncryptedFile),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }

    /// Open the backend. `data_dir` and `passphrase` are only consulted by
    /// the encrypted file store.
    ///
    /// A keychain that can't be reached falls back to the encrypted file
    /// store when a passphrase is available, and is an error otherwise.
    pub async fn open(
        &self,
        data_dir: &Path,
        passphrase: Option<&str>,
    ) -> Result<Arc<dyn SecurePersistence>, StorageError> {
        let passphrase = passphrase.filter(|p| !p.is_empty());
        match self {
            StorageBackend::Keychain => {
                let keychain = KeychainStore::new();
                match keychain.check_available().await {
                    Ok(()) => Ok(Arc::new(keychain)),
                    Err(e) => match passphrase {
                        Some(passphrase) => {
                            warn!(error = %e, "Keychain unavailable, using encrypted file storage");
                            open_encrypted(data_dir, passphrase).await
                        }
                        None => Err(e),
                    },
                }
            }
            StorageBackend::EncryptedFile => {
                let passphrase = passphrase.ok_or(StorageError::MissingPassphrase)?;
                open_encrypted(data_dir, passphrase).await
            }
            StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        }
    }
}

/// Argon2 derivation blocks for a noticeable time, so it runs on the
/// blocking pool.
async fn open_encrypted(
    data_dir: &Path,
    passphrase: &str,
) -> Result<Arc<dyn SecurePersistence>, StorageError> {
    let (dir, passphrase) = (data_dir.to_path_buf(), passphrase.to_string());
    let store = run_blocking(move || EncryptedFileStore::open(dir, &passphrase)).await?;
    Ok(Arc::new(store))
}

/// Keys double as file names in `EncryptedFileStore`, so they are kept to a
/// conservative alphabet everywhere.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Run a blocking storage call off the async executor.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("userToken").is_ok());
        assert!(validate_key("user-token_2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("user token").is_err());
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(StorageBackend::parse("keyring"), Some(StorageBackend::Keychain));
        assert_eq!(StorageBackend::parse("File"), Some(StorageBackend::EncryptedFile));
        assert_eq!(StorageBackend::parse("memory"), Some(StorageBackend::Memory));
        assert_eq!(StorageBackend::parse("cloud"), None);
    }

    #[tokio::test]
    async fn test_encrypted_backend_needs_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let result = StorageBackend::EncryptedFile.open(dir.path(), None).await;
        assert!(matches!(result, Err(StorageError::MissingPassphrase)));

        let result = StorageBackend::EncryptedFile.open(dir.path(), Some("")).await;
        assert!(matches!(result, Err(StorageError::MissingPassphrase)));
    }

    #[tokio::test]
    async fn test_open_encrypted_backend() {
        let dir = tempfile::tempdir().unwrap();
        let store = StorageBackend::EncryptedFile
            .open(dir.path(), Some("hunter2"))
            .await
            .unwrap();

        store.set("userToken", "value").await.unwrap();
        assert_eq!(store.get("userToken").await.unwrap().as_deref(), Some("value"));
        assert!(dir.path().join("userToken.sealed").exists());
    }
}
