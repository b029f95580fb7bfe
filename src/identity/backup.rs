//! # Key Backup
//!
//! Password-wrapped export of the identity private keys for cross-device
//! recovery.
//!
//! ## Wrap Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      WRAPPED PRIVATE KEY                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  password ──► PBKDF2-SHA256(salt, 100k iterations) ──► wrapping key    │
//! │                                                                         │
//! │  plaintext  = bincode{ signing scalar, agreement scalar }              │
//! │  ciphertext = IV (12 bytes) ‖ AES-256-GCM(wrapping key, plaintext)     │
//! │                                                                         │
//! │  Stored/transmitted as { ciphertext: base64, salt: base64 }            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Salt and IV are generated fresh on every wrap and never reused. The
//! blob is independent of the live key lifecycle: it can outlive a device
//! wipe when held in an external [`BackupStore`].
//!
//! ## Failure Semantics
//!
//! A wrong password and a corrupted blob are indistinguishable at the AEAD
//! layer — both surface as the single
//! [`Error::PasswordIncorrectOrCorrupted`]. The implementation must not
//! guess which one happened.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{
    decrypt, derive_key_from_password, encrypt, generate_salt, IdentityKeyPair, Nonce,
    AgreementKeyPair, SigningKeyPair, NONCE_SIZE, PBKDF2_ITERATIONS,
};
use crate::directory::BackupStore;
use crate::error::{Error, Result};

/// Durable, password-protected serialization of exported private keys
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WrappedPrivateKey {
    /// IV-prefixed AES-GCM ciphertext (base64)
    pub ciphertext: String,
    /// PBKDF2 salt (base64)
    pub salt: String,
}

/// Serialized form of the two private scalars inside the wrap
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct KeyExport {
    signing: [u8; 32],
    agreement: [u8; 32],
}

/// Wrap an identity's private keys under a password
///
/// Generates a fresh salt and IV per call.
pub fn wrap(keypair: &IdentityKeyPair, password: &str) -> Result<WrappedPrivateKey> {
    let salt = generate_salt();
    let wrapping_key = derive_key_from_password(password, &salt, PBKDF2_ITERATIONS);

    let export = KeyExport {
        signing: *keypair.signing.secret_bytes(),
        agreement: *keypair.agreement.secret_bytes(),
    };
    let payload = Zeroizing::new(bincode::serialize(&export)?);

    let (nonce, ciphertext) = encrypt(&wrapping_key, &payload)?;

    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(nonce.as_bytes());
    combined.extend_from_slice(&ciphertext);

    Ok(WrappedPrivateKey {
        ciphertext: BASE64.encode(&combined),
        salt: BASE64.encode(salt),
    })
}

/// Unwrap a password-protected key export
///
/// ## Errors
///
/// Any failure — undecodable blob, AEAD tag mismatch, unparseable
/// plaintext — surfaces as [`Error::PasswordIncorrectOrCorrupted`].
pub fn unwrap(wrapped: &WrappedPrivateKey, password: &str) -> Result<IdentityKeyPair> {
    let salt = BASE64
        .decode(&wrapped.salt)
        .map_err(|_| Error::PasswordIncorrectOrCorrupted)?;
    let combined = BASE64
        .decode(&wrapped.ciphertext)
        .map_err(|_| Error::PasswordIncorrectOrCorrupted)?;

    if combined.len() < NONCE_SIZE {
        return Err(Error::PasswordIncorrectOrCorrupted);
    }

    let nonce = Nonce::from_slice(&combined[..NONCE_SIZE])
        .map_err(|_| Error::PasswordIncorrectOrCorrupted)?;
    let wrapping_key = derive_key_from_password(password, &salt, PBKDF2_ITERATIONS);

    let payload = Zeroizing::new(
        decrypt(&wrapping_key, &nonce, &combined[NONCE_SIZE..])
            .map_err(|_| Error::PasswordIncorrectOrCorrupted)?,
    );

    let export: KeyExport =
        bincode::deserialize(&payload).map_err(|_| Error::PasswordIncorrectOrCorrupted)?;

    Ok(IdentityKeyPair {
        signing: SigningKeyPair::from_bytes(&export.signing)?,
        agreement: AgreementKeyPair::from_bytes(&export.agreement)?,
    })
}

/// Wrap an identity and upload it to a backup store
pub async fn backup_to(
    store: &dyn BackupStore,
    user_id: &str,
    keypair: &IdentityKeyPair,
    password: &str,
) -> Result<()> {
    let wrapped = wrap(keypair, password)?;
    store.put_backup(user_id, &wrapped).await?;

    tracing::info!(user_id, "Uploaded password-wrapped key backup");
    Ok(())
}

/// Fetch a user's backup and unwrap it
///
/// ## Errors
///
/// - [`Error::KeyNotFound`] when the store has no backup for this user
/// - [`Error::PasswordIncorrectOrCorrupted`] when the blob will not unwrap
pub async fn restore_from(
    store: &dyn BackupStore,
    user_id: &str,
    password: &str,
) -> Result<IdentityKeyPair> {
    let wrapped = store
        .fetch_backup(user_id)
        .await?
        .ok_or_else(|| Error::KeyNotFound(format!("No key backup for user {}", user_id)))?;

    unwrap(&wrapped, password)
}

// ============================================================================
// TESTS
// ============================================================================
