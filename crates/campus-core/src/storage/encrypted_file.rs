//! Passphrase-sealed file storage.
//!
//! Each key is one `<key>.sealed` file holding `nonce || ciphertext`, sealed
//! with ChaCha20-Poly1305 under a key derived by Argon2id from the passphrase
//! and a random per-store salt (`store.salt`). The key name is bound in as
//! associated data, so a sealed file renamed to another key fails to open.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use argon2::Argon2;
use async_trait::async_trait;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;
use tracing::{debug, info};

use super::{run_blocking, validate_key, SecurePersistence, StorageError};

const SALT_FILE: &str = "store.salt";
const SEALED_EXTENSION: &str = "sealed";

/// Salt length in bytes (Argon2 requires at least 8)
const SALT_LENGTH: usize = 16;

/// Nonce length for ChaCha20-Poly1305 (12 bytes standard)
const NONCE_LENGTH: usize = 12;

/// Poly1305 tag length
const TAG_LENGTH: usize = 16;

/// Derived key length (32 bytes)
const KEY_LENGTH: usize = 32;

pub struct EncryptedFileStore {
    inner: Arc<SealedDir>,
}

/// Directory plus cipher, shared with the blocking tasks that touch disk.
struct SealedDir {
    dir: PathBuf,
    cipher: ChaCha20Poly1305,
}

impl EncryptedFileStore {
    /// Open (or create) a store in `dir`. Opening an existing store with a
    /// different passphrase succeeds, but every `get` on it will fail.
    pub fn open(dir: impl Into<PathBuf>, passphrase: &str) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let salt = Self::load_or_create_salt(&dir)?;
        let key = derive_key(passphrase, &salt)?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|e| StorageError::Crypto(format!("Failed to create cipher: {}", e)))?;

        debug!(dir = ?dir, "Encrypted file store opened");
        Ok(Self {
            inner: Arc::new(SealedDir { dir, cipher }),
        })
    }

    fn load_or_create_salt(dir: &Path) -> Result<[u8; SALT_LENGTH], StorageError> {
        let path = dir.join(SALT_FILE);
        let mut salt = [0u8; SALT_LENGTH];

        if path.exists() {
            let bytes = fs::read(&path)?;
            // Regenerating would orphan every sealed file, so refuse instead
            if bytes.len() != SALT_LENGTH {
                return Err(StorageError::Crypto(format!(
                    "Salt file has {} bytes, expected {}",
                    bytes.len(),
                    SALT_LENGTH
                )));
            }
            salt.copy_from_slice(&bytes);
        } else {
            OsRng.fill_bytes(&mut salt);
            fs::write(&path, salt)?;
            info!(path = ?path, "Created new storage salt");
        }

        Ok(salt)
    }
}

impl SealedDir {
    fn sealed_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, SEALED_EXTENSION))
    }

    fn seal(&self, key: &str, value: &str) -> Result<Vec<u8>, StorageError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: value.as_bytes(),
                    aad: key.as_bytes(),
                },
            )
            .map_err(|e| StorageError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn unseal(&self, key: &str, sealed: &[u8]) -> Result<String, StorageError> {
        if sealed.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(StorageError::Crypto(format!(
                "Sealed value for {:?} is truncated ({} bytes)",
                key,
                sealed.len()
            )));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| {
                StorageError::Crypto("Failed to decrypt value (wrong passphrase or tampered file)".to_string())
            })?;

        String::from_utf8(plaintext)
            .map_err(|e| StorageError::Crypto(format!("Decrypted value is not UTF-8: {}", e)))
    }

    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.sealed_path(key);
        let sealed = match fs::read(&path) {
            Ok(sealed) => sealed,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        self.unseal(key, &sealed).map(Some)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let sealed = self.seal(key, value)?;

        // Write then rename so a crash never leaves a half-written file
        let path = self.sealed_path(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, sealed)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.sealed_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Result<[u8; KEY_LENGTH], StorageError> {
    let mut key = [0u8; KEY_LENGTH];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| StorageError::Crypto(format!("Key derivation failed: {}", e)))?;
    Ok(key)
}

#[async_trait]
impl SecurePersistence for EncryptedFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        let (inner, key) = (self.inner.clone(), key.to_string());
        run_blocking(move || inner.read(&key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let (inner, key, value) = (self.inner.clone(), key.to_string(), value.to_string());
        run_blocking(move || inner.write(&key, &value)).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let (inner, key) = (self.inner.clone(), key.to_string());
        run_blocking(move || inner.remove(&key)).await
    }
}

// ============================================================================
// Tests
// ============================================================================
