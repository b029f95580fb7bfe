//! # Error Handling
//!
//! This module provides the error types for Velum Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Key Errors                                                        │
//! │  │   ├── KeyNotFound           - Local private key absent               │
//! │  │   ├── MissingPrivateKey     - Directory has keys, device does not    │
//! │  │   ├── CannotRepublish       - Local public keys unreadable           │
//! │  │   ├── KeyMismatch           - Local/remote public keys diverged      │
//! │  │   └── InvalidKey            - Key bytes malformed                    │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── Agreement             - ECDH input malformed / off-curve       │
//! │  │   ├── SignatureInvalid      - Verification failed (possible tamper)  │
//! │  │   ├── DecryptionFailed      - AEAD tag mismatch                      │
//! │  │   ├── EncryptionFailed      - AEAD encrypt failed                    │
//! │  │   └── KeyDerivationFailed   - HKDF/PBKDF2 expansion failed           │
//! │  │                                                                      │
//! │  ├── Session Errors                                                    │
//! │  │   ├── SessionNotFound       - No local ephemeral key for session     │
//! │  │   ├── SessionNotReady       - Counterparty has not joined yet        │
//! │  │   └── SessionExpired        - Past expires_at; create a new session  │
//! │  │                                                                      │
//! │  ├── Backup Errors                                                     │
//! │  │   └── PasswordIncorrectOrCorrupted                                  │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── StorageReadError      - Failed to read from local store        │
//! │  │   ├── StorageWriteError     - Failed to write to local store         │
//! │  │   └── StorageCorrupted      - Data corruption detected               │
//! │  │                                                                      │
//! │  └── External Errors                                                   │
//! │      ├── Directory             - Directory service call failed          │
//! │      ├── SerializationError                                            │
//! │      └── DeserializationError                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation Policy
//!
//! Primitive-level failures (bad curve points, AEAD tag mismatches) are
//! translated one layer up into the variants above — callers above the
//! message cipher never see raw primitive errors. `DecryptionFailed` is
//! retried exactly once inside the cipher; `SignatureInvalid` is treated as
//! a potential security event and never retried. `MissingPrivateKey` and
//! `CannotRepublish` are terminal for the current device and carry
//! actionable guidance for the user.

use thiserror::Error;

/// Result type alias for Velum Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Velum Core
///
/// All errors are categorized by module/domain to make error handling
/// clearer and to provide meaningful error messages to users.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key Errors
    // ========================================================================

    /// A required local private key is absent
    #[error("Local private key not found: {0}")]
    KeyNotFound(String),

    /// The directory has published keys but this device has no private keys
    #[error("Missing local private keys. Restore your key backup to read old messages.")]
    MissingPrivateKey,

    /// Local public keys are unreadable, so they cannot be re-published
    #[error("Local public keys missing or unreadable. Restore from backup to keep history.")]
    CannotRepublish,

    /// Local and remote public keys diverged
    #[error("Local and published public keys do not match")]
    KeyMismatch,

    /// Key bytes are malformed (wrong length, not a curve point, ...)
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // ========================================================================
    // Crypto Errors
    // ========================================================================

    /// ECDH input malformed or on the wrong curve
    #[error("Key agreement failed: {0}")]
    Agreement(String),

    /// Signature verification failed — possible tampering or wrong signer
    #[error("Invalid signature: message may be tampered with")]
    SignatureInvalid,

    /// AEAD authentication tag mismatch (wrong key, tampered data, or wrong IV)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// AEAD encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// HKDF or PBKDF2 derivation failed
    #[error("Failed to derive keys: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Session Errors
    // ========================================================================

    /// A session was referenced but its local ephemeral key is missing
    /// (for example, the session was created on a different device)
    #[error("Session not found: no local ephemeral key for session {0}")]
    SessionNotFound(String),

    /// The counterparty has not published their ephemeral key yet
    #[error("Session {0} is not ready: counterparty has not joined")]
    SessionNotReady(String),

    /// The session is past its expiry; a new session must be created
    #[error("Session {0} has expired")]
    SessionExpired(String),

    // ========================================================================
    // Backup Errors
    // ========================================================================

    /// The backup could not be unwrapped. Wrong password and corrupted
    /// ciphertext are indistinguishable at the AEAD layer, so this single
    /// variant intentionally covers both.
    #[error("Incorrect password or corrupted key backup")]
    PasswordIncorrectOrCorrupted,

    // ========================================================================
    // Storage Errors
    // ========================================================================

    /// Failed to read from the local key store
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write to the local key store
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    /// Stored data failed an integrity check
    #[error("Data corruption detected: {0}")]
    StorageCorrupted(String),

    // ========================================================================
    // External Errors
    // ========================================================================

    /// Directory service call failed
    #[error("Directory error: {0}")]
    Directory(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl Error {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors can potentially be resolved by retrying
    /// or by re-establishing state (e.g., creating a fresh session).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Directory(_)
                | Error::SessionExpired(_)
                | Error::SessionNotReady(_)
                | Error::KeyMismatch
        )
    }

    /// Check if this error requires user action
    ///
    /// These must be surfaced with actionable guidance (restore a backup,
    /// log in again) and never silently swallowed.
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Error::MissingPrivateKey
                | Error::CannotRepublish
                | Error::PasswordIncorrectOrCorrupted
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
