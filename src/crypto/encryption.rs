//! # Encryption Module
//!
//! Provides AES-256-GCM encryption for message confidentiality and integrity.
//!
//! ## Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE ENCRYPTION FLOW                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Step 1: Derive Shared Secret (once per conversation)                  │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  my ECDH private key × their ECDH public key               │       │
//! │  │           ↓                                                  │       │
//! │  │  Raw Shared Secret (32 bytes)                                │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Step 2: Derive Encryption Key (from shared secret)                    │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  HKDF-SHA256(                                                │       │
//! │  │    ikm = shared_secret,                                     │       │
//! │  │    salt = context (pair or session id),                     │       │
//! │  │    info = "velum-shared-secret-v1"                          │       │
//! │  │  )                                                          │       │
//! │  │           ↓                                                  │       │
//! │  │  Encryption Key (32 bytes)                                   │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Step 3: Encrypt                                                       │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  AES-256-GCM(                                                │       │
//! │  │    key = encryption_key,                                    │       │
//! │  │    iv = fresh random 12 bytes,                              │       │
//! │  │    plaintext = message                                      │       │
//! │  │  )                                                          │       │
//! │  │           ↓                                                  │       │
//! │  │  Ciphertext + 16-byte Auth Tag                              │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Output: (iv, ciphertext_with_tag)                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decryption runs the same derivation on the receiving side (ECDH symmetry
//! guarantees the same key) and fails atomically on tag mismatch: a wrong
//! key, tampered ciphertext, or wrong IV never yields partial plaintext.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::RngCore;
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A nonce (number used once) for AES-GCM encryption
///
/// ## Critical Security Requirement
///
/// **NEVER reuse a nonce with the same key!**
///
/// Nonce reuse completely breaks AES-GCM security:
/// - Allows recovering the authentication key
/// - Allows forging messages
/// - May allow recovering plaintext
///
/// `encrypt` generates a fresh random nonce on every call; callers cannot
/// supply one on the encryption path. Random 96-bit nonces are safe for up
/// to 2^32 messages per key (birthday bound).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from existing bytes (decryption path)
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice (must be exactly 12 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; NONCE_SIZE] = slice
            .try_into()
            .map_err(|_| Error::DeserializationError("Invalid nonce length".into()))?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// A raw shared secret produced by ECDH key agreement
///
/// This is never used directly as an encryption key; it is passed through
/// HKDF-SHA256 first (see [`SharedSecret::derive_key`]).
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: [u8; 32],
}

impl SharedSecret {
    /// Create from raw DH output
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Derive an encryption key from this shared secret
    ///
    /// Uses HKDF-SHA256 with the given context (a pair identifier or
    /// session id) as salt. Both sides of a conversation apply the same
    /// context, so ECDH symmetry carries through to the derived key.
    pub fn derive_key(&self, context: &[u8]) -> Result<EncryptionKey> {
        use hkdf::Hkdf;
        use sha2::Sha256;

        let hkdf = Hkdf::<Sha256>::new(Some(context), &self.bytes);
        let mut key = [0u8; KEY_SIZE];
        hkdf.expand(super::kdf::domain::SHARED_SECRET, &mut key)
            .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()))?;

        Ok(EncryptionKey(key))
    }
}

/// An AES-256-GCM encryption key
///
/// Zeroized when dropped for security.
#[derive(ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw key bytes (for caching and key wrapping)
    pub(crate) fn as_inner(&self) -> [u8; KEY_SIZE] {
        self.0
    }
}

impl Clone for EncryptionKey {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

/// Encrypt a message using AES-256-GCM
///
/// A fresh random nonce is generated per call and returned alongside the
/// ciphertext; the ciphertext includes the 16-byte authentication tag.
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8]) -> Result<(Nonce, Vec<u8>)> {
    let nonce = Nonce::random();
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let ciphertext = cipher
        .encrypt(AesNonce::from_slice(&nonce.0), plaintext)
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    Ok((nonce, ciphertext))
}

/// Decrypt a message using AES-256-GCM
///
/// ## Errors
///
/// Returns `DecryptionFailed` if:
/// - The ciphertext was tampered with
/// - The key is wrong
/// - The nonce is wrong
///
/// On failure no plaintext is returned — GCM authenticates before
/// releasing any output.
pub fn decrypt(key: &EncryptionKey, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?;

    cipher
        .decrypt(AesNonce::from_slice(&nonce.0), ciphertext)
        .map_err(|_| {
            Error::DecryptionFailed("authentication tag mismatch".into())
        })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AgreementKeyPair;
    use std::collections::HashSet;

    #[test]
    fn test_encrypt_decrypt_basic() {
        let key = EncryptionKey::from_bytes([42u8; 32]);
        let plaintext = b"Hello, World!";

        let (nonce, ciphertext) = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &nonce, &ciphertext).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let key = EncryptionKey::from_bytes([42u8; 32]);

        let (nonce, ciphertext) = encrypt(&key, b"").unwrap();
        let decrypted = decrypt(&key, &nonce, &ciphertext).unwrap();

        assert_eq!(decrypted, b"");
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = EncryptionKey::from_bytes([42u8; 32]);

        let (nonce, mut ciphertext) = encrypt(&key, b"Hello, World!").unwrap();
        ciphertext[0] ^= 0xFF;

        let result = decrypt(&key, &nonce, &ciphertext);
        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = EncryptionKey::from_bytes([42u8; 32]);
        let key2 = EncryptionKey::from_bytes([99u8; 32]);

        let (nonce, ciphertext) = encrypt(&key1, b"secret").unwrap();
        let result = decrypt(&key2, &nonce, &ciphertext);

        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let key = EncryptionKey::from_bytes([42u8; 32]);

        let (_, ciphertext) = encrypt(&key, b"secret").unwrap();
        let result = decrypt(&key, &Nonce::from_bytes([7u8; NONCE_SIZE]), &ciphertext);

        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_derived_keys_agree_across_parties() {
        let alice = AgreementKeyPair::generate();
        let bob = AgreementKeyPair::generate();

        let alice_secret = SharedSecret::from_bytes(alice.diffie_hellman(&bob.public_bytes()).unwrap());
        let bob_secret = SharedSecret::from_bytes(bob.diffie_hellman(&alice.public_bytes()).unwrap());

        let context = b"alice-bob";
        let alice_key = alice_secret.derive_key(context).unwrap();
        let bob_key = bob_secret.derive_key(context).unwrap();

        // Alice encrypts, Bob decrypts
        let (nonce, ciphertext) = encrypt(&alice_key, b"Secret message for Bob").unwrap();
        let decrypted = decrypt(&bob_key, &nonce, &ciphertext).unwrap();

        assert_eq!(decrypted, b"Secret message for Bob");
    }

    #[test]
    fn test_different_contexts_derive_different_keys() {
        let secret = SharedSecret::from_bytes([7u8; 32]);

        let k1 = secret.derive_key(b"pair-a").unwrap();
        let k2 = secret.derive_key(b"pair-b").unwrap();

        assert_ne!(k1.as_inner(), k2.as_inner());
    }

    #[test]
    fn test_iv_uniqueness() {
        let key = EncryptionKey::from_bytes([42u8; 32]);
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let (nonce, _) = encrypt(&key, b"x").unwrap();
            assert!(seen.insert(nonce.0), "nonce collision");
        }
    }
}
