//! # Secure Storage
//!
//! Local secure storage for private key material.
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    KEY STORAGE SECURITY                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  What We Store:                                                        │
//! │  ───────────────                                                        │
//! │                                                                         │
//! │  1. Identity Private Keys                                              │
//! │     - ECDSA signing key scalar                                         │
//! │     - ECDH agreement key scalar                                        │
//! │                                                                         │
//! │  2. Identity Public Keys                                               │
//! │     - Needed locally so the reconciler can re-publish them             │
//! │       without touching private material                                │
//! │                                                                         │
//! │  3. Session Ephemeral Private Keys                                     │
//! │     - One per session, keyed by session id                             │
//! │                                                                         │
//! │  Security Properties:                                                  │
//! │  ────────────────────                                                   │
//! │                                                                         │
//! │  • Optional at-rest encryption (AES-256-GCM, nonce-prefixed)          │
//! │  • Values are never logged                                             │
//! │  • clear() on logout is irreversible                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The in-memory backing is the reference implementation; a deployment
//! substitutes a platform keystore behind the same interface.

use parking_lot::RwLock;
use std::collections::HashMap;
use zeroize::Zeroizing;

use crate::crypto::{decrypt, encrypt, EncryptionKey, Nonce, NONCE_SIZE};
use crate::error::{Error, Result};

/// Logical key names for secure storage
///
/// Names are stable strings so a device can find its own material across
/// restarts. They never contain key bytes.
pub mod names {
    /// The identity ECDH private key for a user
    pub fn agreement_private(user_id: &str) -> String {
        format!("{}-ecdh-private", user_id)
    }

    /// The identity ECDSA private key for a user
    pub fn signing_private(user_id: &str) -> String {
        format!("{}-ecdsa-private", user_id)
    }

    /// The identity ECDH public key for a user
    pub fn agreement_public(user_id: &str) -> String {
        format!("{}-ecdh-public", user_id)
    }

    /// The identity ECDSA public key for a user
    pub fn signing_public(user_id: &str) -> String {
        format!("{}-ecdsa-public", user_id)
    }

    /// The ephemeral ECDH private key for a session
    pub fn session_ephemeral(session_id: &str) -> String {
        format!("session_{}_ecdh", session_id)
    }
}

/// Secure storage interface
///
/// Platform-agnostic key-value store for key material. All values are
/// opaque byte strings; when constructed with an encryption key, values
/// are encrypted at rest.
pub struct SecureStore {
    /// In-memory backing store
    memory: RwLock<HashMap<String, Vec<u8>>>,

    /// Optional encryption key for at-rest protection
    encryption_key: Option<EncryptionKey>,
}

impl SecureStore {
    /// Create a new secure store
    pub fn new() -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            encryption_key: None,
        }
    }

    /// Create a secure store with an encryption key
    ///
    /// All data will be encrypted before storage.
    pub fn with_encryption(key: [u8; 32]) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            encryption_key: Some(EncryptionKey::from_bytes(key)),
        }
    }

    /// Store data securely
    ///
    /// The data will be encrypted if an encryption key was provided.
    pub fn store(&self, name: &str, value: &[u8]) -> Result<()> {
        let data = if let Some(ref enc_key) = self.encryption_key {
            let (nonce, ciphertext) = encrypt(enc_key, value)?;
            let mut result = nonce.as_bytes().to_vec();
            result.extend_from_slice(&ciphertext);
            result
        } else {
            value.to_vec()
        };

        let mut storage = self.memory.write();
        storage.insert(name.to_string(), data);
        Ok(())
    }

    /// Retrieve data securely
    ///
    /// Returns `None` (not an error) when the name is absent. The data
    /// will be decrypted if an encryption key was provided.
    pub fn retrieve(&self, name: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        let data = {
            let storage = self.memory.read();
            match storage.get(name) {
                Some(d) => d.clone(),
                None => return Ok(None),
            }
        };

        let result = if let Some(ref enc_key) = self.encryption_key {
            if data.len() < NONCE_SIZE {
                return Err(Error::StorageReadError("Stored data too short".into()));
            }

            let nonce = Nonce::from_slice(&data[..NONCE_SIZE])?;
            let plaintext = decrypt(enc_key, &nonce, &data[NONCE_SIZE..])
                .map_err(|_| Error::StorageCorrupted(format!("Cannot decrypt entry '{}'", name)))?;
            Zeroizing::new(plaintext)
        } else {
            Zeroizing::new(data)
        };

        Ok(Some(result))
    }

    /// Delete data from secure storage
    ///
    /// Returns whether the name was present.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let mut storage = self.memory.write();
        Ok(storage.remove(name).is_some())
    }

    /// Check if a name exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        let storage = self.memory.read();
        Ok(storage.contains_key(name))
    }

    /// Delete everything — called on logout. Irreversible.
    pub fn clear(&self) {
        let mut storage = self.memory.write();
        storage.clear();
    }
}

impl Default for SecureStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_retrieve() {
        let store = SecureStore::new();

        store.store("test-key", b"test-value").unwrap();

        let value = store.retrieve("test-key").unwrap().unwrap();
        assert_eq!(&*value, b"test-value");

        let deleted = store.delete("test-key").unwrap();
        assert!(deleted);

        let value = store.retrieve("test-key").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_store_with_encryption() {
        let key = [42u8; 32];
        let store = SecureStore::with_encryption(key);

        store.store("secret", b"very secret data").unwrap();

        let value = store.retrieve("secret").unwrap().unwrap();
        assert_eq!(&*value, b"very secret data");
    }

    #[test]
    fn test_exists() {
        let store = SecureStore::new();

        assert!(!store.exists("nonexistent").unwrap());

        store.store("exists", b"data").unwrap();
        assert!(store.exists("exists").unwrap());
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = SecureStore::new();

        store.store(&names::signing_private("alice"), b"k1").unwrap();
        store.store(&names::agreement_private("alice"), b"k2").unwrap();
        store.store(&names::session_ephemeral("s1"), b"k3").unwrap();

        store.clear();

        assert!(!store.exists(&names::signing_private("alice")).unwrap());
        assert!(!store.exists(&names::agreement_private("alice")).unwrap());
        assert!(!store.exists(&names::session_ephemeral("s1")).unwrap());
    }

    #[test]
    fn test_logical_names_are_stable() {
        assert_eq!(names::signing_private("u1"), "u1-ecdsa-private");
        assert_eq!(names::agreement_private("u1"), "u1-ecdh-private");
        assert_eq!(names::session_ephemeral("abc"), "session_abc_ecdh");
    }
}
