//! # Velum Core
//!
//! The key and session cryptography engine for Velum, a pairwise
//! end-to-end encrypted messenger. Every message leaving a device is
//! confidential against the transport and tamper-evident against
//! impersonation; this crate owns the key lifecycle that makes that true.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         VELUM CORE MODULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │  Identity   │  │   Session   │  │   Secrets   │  │   Messaging  │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Keypairs  │  │ - Ephemeral │  │ - Pair      │  │ - Envelopes  │   │
//! │  │ - Backup    │  │   keys      │  │   secrets   │  │ - Sign +     │   │
//! │  │ - Reconcile │  │ - Rotation  │  │ - Caching   │  │   encrypt    │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘  └──────┬───────┘   │
//! │         │                │                │                │           │
//! │         └────────────────┴────────────────┴────────────────┘           │
//! │                                   │                                     │
//! │  ┌─────────────┐  ┌─────────────┐ │ ┌─────────────────────────────────┐│
//! │  │   Crypto    │  │   Storage   │ │ │          Directory              ││
//! │  │             │  │             │ │ │                                 ││
//! │  │ - P-256     │  │ - Secure    │◄┘ │ - Public key bundles           ││
//! │  │ - AES-GCM   │  │   key store │   │ - Session brokering            ││
//! │  │ - PBKDF2    │  │ - Encrypted │   │ - Backup blobs (external)      ││
//! │  └─────────────┘  └─────────────┘   └─────────────────────────────────┘│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Cryptographic primitives (keys, encryption, signing, KDF)
//! - [`identity`] - Identity key lifecycle, backup, and reconciliation
//! - [`secrets`] - Shared-secret derivation and caching
//! - [`session`] - Ephemeral per-conversation sessions
//! - [`messaging`] - Envelope encryption and the message cipher
//! - [`storage`] - Local secure key-value store
//! - [`directory`] - External directory / backup-store interfaces
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY INVARIANTS                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. No plaintext leaves the device unencrypted                          │
//! │     Every outgoing message is AES-256-GCM encrypted under a secret     │
//! │     derived from ephemeral session keys.                               │
//! │                                                                         │
//! │  2. No message is accepted without signature verification               │
//! │     ECDSA verification runs before decryption, always; a failure       │
//! │     aborts without touching the ciphertext.                            │
//! │                                                                         │
//! │  3. A private key is never transmitted unencrypted                      │
//! │     Private material leaves the device only inside a password-         │
//! │     wrapped AEAD blob (key backup).                                    │
//! │                                                                         │
//! │  4. Local keys and published keys never silently diverge                │
//! │     The reconciler runs at every bootstrap and repairs the             │
//! │     directory from the device, never the other way around.             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod directory;
pub mod error;
pub mod identity;
pub mod messaging;
pub mod secrets;
pub mod session;
pub mod storage;
/// Time utilities shared by session expiry and cache bookkeeping.
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{IdentityKeyPair, PublicKeyBundle};
pub use error::{Error, Result};
pub use identity::{IdentityKeyStore, ReconcileOutcome, WrappedPrivateKey};
pub use messaging::{EncryptedEnvelope, MessageCipher, Peer, User};
pub use secrets::{PairKey, SharedSecretManager};
pub use session::{SessionManager, SessionRecord, SessionState};
pub use storage::SecureStore;

// ============================================================================
// CORE INSTANCE
// ============================================================================

use std::sync::Arc;

use directory::{BackupStore, DirectoryService};

/// Configuration for a [`VelumCore`] instance
///
/// Deliberately not `Debug`: the store encryption key must never end up
/// in logs.
#[derive(Clone)]
pub struct CoreConfig {
    /// The authenticated user this core instance belongs to
    pub user_id: String,
    /// Optional at-rest encryption key for the local key store
    pub store_encryption_key: Option<[u8; 32]>,
}

impl CoreConfig {
    /// Configuration with a plaintext-at-rest local store
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            store_encryption_key: None,
        }
    }
}

/// The application-root context object
///
/// Owns the secure store, the shared-secret cache, and the managers that
/// operate on them — one instance per authenticated session, passed by
/// reference to whoever needs it. There is deliberately no process-global
/// instance: "one cache per running session" is a property of ownership
/// here, not of hidden static state.
///
/// ## Lifecycle
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                        VELUM CORE LIFECYCLE                             │
/// ├─────────────────────────────────────────────────────────────────────────┤
/// │                                                                         │
/// │  1. VelumCore::new(config, directory)                                  │
/// │            │                                                           │
/// │            ▼                                                           │
/// │  2. bootstrap()  ── reconcile local keys against the directory         │
/// │            │        (generate / republish / verify / fail loudly)      │
/// │            ▼                                                           │
/// │  3. sessions().create_session(..)  per conversation                    │
/// │            │                                                           │
/// │            ▼                                                           │
/// │  4. cipher().encrypt_to(..) / cipher().decrypt_from(..)                │
/// │            │                                                           │
/// │            ▼                                                           │
/// │  5. logout() ── clear private keys + cache, irreversible               │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub struct VelumCore {
    user_id: String,
    store: Arc<SecureStore>,
    secrets: Arc<SharedSecretManager>,
    identity: IdentityKeyStore,
    sessions: Arc<SessionManager>,
    cipher: MessageCipher,
    directory: Arc<dyn DirectoryService>,
}

impl VelumCore {
    /// Build a core instance against a directory service
    pub fn new(config: CoreConfig, directory: Arc<dyn DirectoryService>) -> Self {
        let store = Arc::new(match config.store_encryption_key {
            Some(key) => SecureStore::with_encryption(key),
            None => SecureStore::new(),
        });
        let secrets = Arc::new(SharedSecretManager::new());

        let identity = IdentityKeyStore::new(config.user_id.clone(), store.clone());
        let sessions = Arc::new(SessionManager::new(
            config.user_id.clone(),
            store.clone(),
            secrets.clone(),
            directory.clone(),
        ));
        let cipher = MessageCipher::new(
            config.user_id.clone(),
            sessions.clone(),
            secrets.clone(),
            directory.clone(),
        );

        Self {
            user_id: config.user_id,
            store,
            secrets,
            identity,
            sessions,
            cipher,
            directory,
        }
    }

    /// The authenticated user this core belongs to
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Reconcile key state against the directory
    ///
    /// Runs once per authenticated session start, before any session or
    /// message work. See [`identity::reconcile`] for the repair table.
    pub async fn bootstrap(&self) -> Result<ReconcileOutcome> {
        tracing::info!(user_id = %self.user_id, "Bootstrapping Velum core");
        identity::reconcile(&self.identity, &self.secrets, self.directory.as_ref()).await
    }

    /// The identity key store
    pub fn identity(&self) -> &IdentityKeyStore {
        &self.identity
    }

    /// The session manager
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// The message cipher
    pub fn cipher(&self) -> &MessageCipher {
        &self.cipher
    }

    /// The shared-secret cache
    pub fn secrets(&self) -> &SharedSecretManager {
        &self.secrets
    }

    /// Load this user's identity keypair from the local store
    ///
    /// ## Errors
    ///
    /// [`Error::KeyNotFound`] when no complete identity is present —
    /// run [`bootstrap`](Self::bootstrap) first.
    pub fn load_identity(&self) -> Result<IdentityKeyPair> {
        self.identity
            .load_local_private_keys()?
            .ok_or_else(|| Error::KeyNotFound(format!("No identity keys for {}", self.user_id)))
    }

    /// Wrap the identity under a password and upload it to a backup store
    pub async fn backup_identity(&self, backup: &dyn BackupStore, password: &str) -> Result<()> {
        let keypair = self.load_identity()?;
        identity::backup_to(backup, &self.user_id, &keypair, password).await
    }

    /// Restore the identity from a password-wrapped backup
    ///
    /// Persists the restored keys locally, republishes the public bundle,
    /// and drops every cached secret. This is the recovery path for
    /// [`Error::MissingPrivateKey`] at bootstrap.
    pub async fn restore_identity(&self, backup: &dyn BackupStore, password: &str) -> Result<()> {
        let keypair = identity::restore_from(backup, &self.user_id, password).await?;
        let bundle = self.identity.persist(&keypair)?;

        self.directory.publish_keys(&bundle).await?;
        self.secrets.invalidate_all();

        tracing::info!(user_id = %self.user_id, "Identity restored from backup");
        Ok(())
    }

    /// Log out: destroy all local key material and cached secrets
    ///
    /// Irreversible. After this, only a fresh registration or a backup
    /// restore brings the account back to this device.
    pub fn logout(&self) -> Result<()> {
        self.identity.clear()?;
        self.store.clear();
        self.secrets.invalidate_all();

        tracing::info!(user_id = %self.user_id, "Logged out; local key material destroyed");
        Ok(())
    }
}

/// Returns the version of Velum Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use directory::{InMemoryBackupStore, InMemoryDirectory};

    fn core(user_id: &str, directory: &Arc<InMemoryDirectory>) -> VelumCore {
        VelumCore::new(
            CoreConfig::new(user_id),
            directory.clone() as Arc<dyn DirectoryService>,
        )
    }

    #[tokio::test]
    async fn test_first_bootstrap_generates_identity() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = core("alice", &directory);

        let outcome = alice.bootstrap().await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::GeneratedNew);
        assert!(alice.load_identity().is_ok());
    }

    #[tokio::test]
    async fn test_second_bootstrap_verifies() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = core("alice", &directory);

        alice.bootstrap().await.unwrap();
        let outcome = alice.bootstrap().await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Verified);
    }

    #[tokio::test]
    async fn test_full_conversation_through_the_core() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = core("alice", &directory);
        let bob = core("bob", &directory);

        alice.bootstrap().await.unwrap();
        bob.bootstrap().await.unwrap();

        let alice_identity = alice.load_identity().unwrap();
        let bob_identity = bob.load_identity().unwrap();

        alice
            .sessions()
            .create_session(&alice_identity, "bob")
            .await
            .unwrap();
        let bob_session = bob
            .sessions()
            .create_session(&bob_identity, "alice")
            .await
            .unwrap();
        let alice_session = alice
            .sessions()
            .fetch_session(&bob_session.session_id)
            .await
            .unwrap();

        // Alice → Bob
        let envelope = alice
            .cipher()
            .encrypt_to(&alice_identity, &alice_session, b"hello from alice")
            .await
            .unwrap();
        let plaintext = bob
            .cipher()
            .decrypt_from(&envelope, &Peer::Id("alice".into()))
            .await
            .unwrap();
        assert_eq!(plaintext, b"hello from alice");

        // Bob → Alice
        let envelope = bob
            .cipher()
            .encrypt_to(&bob_identity, &bob_session, b"hello from bob")
            .await
            .unwrap();
        let plaintext = alice
            .cipher()
            .decrypt_from(&envelope, &Peer::Id("bob".into()))
            .await
            .unwrap();
        assert_eq!(plaintext, b"hello from bob");
    }

    #[tokio::test]
    async fn test_logout_then_bootstrap_requires_backup() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = core("alice", &directory);

        alice.bootstrap().await.unwrap();
        alice.logout().unwrap();

        // Keys are still published, but this device has nothing
        let result = alice.bootstrap().await;
        assert!(matches!(result, Err(Error::MissingPrivateKey)));
    }

    #[tokio::test]
    async fn test_backup_restore_recovers_the_device() {
        let directory = Arc::new(InMemoryDirectory::new());
        let backup = InMemoryBackupStore::new();
        let alice = core("alice", &directory);

        alice.bootstrap().await.unwrap();
        let original = alice.identity().export_public_keys().unwrap().unwrap();
        alice.backup_identity(&backup, "hunter2").await.unwrap();

        // Device wipe
        alice.logout().unwrap();
        assert!(matches!(
            alice.bootstrap().await,
            Err(Error::MissingPrivateKey)
        ));

        // Restore and bootstrap again: the same keys are back
        alice.restore_identity(&backup, "hunter2").await.unwrap();
        let outcome = alice.bootstrap().await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Verified);
        assert_eq!(
            alice.identity().export_public_keys().unwrap(),
            Some(original)
        );
    }

    #[tokio::test]
    async fn test_restore_with_wrong_password_fails() {
        let directory = Arc::new(InMemoryDirectory::new());
        let backup = InMemoryBackupStore::new();
        let alice = core("alice", &directory);

        alice.bootstrap().await.unwrap();
        alice.backup_identity(&backup, "right").await.unwrap();
        alice.logout().unwrap();

        let result = alice.restore_identity(&backup, "wrong").await;
        assert!(matches!(result, Err(Error::PasswordIncorrectOrCorrupted)));
    }

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
