//! # Directory Module
//!
//! Interfaces to the external collaborators the crypto engine consumes but
//! does not implement: the key directory service (public keys + sessions)
//! and the backup blob store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      EXTERNAL COLLABORATORS                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────┐      ┌──────────────────┐                        │
//! │  │ DirectoryService │      │   BackupStore    │                        │
//! │  │                  │      │                  │                        │
//! │  │ • publish_keys   │      │ • put_backup     │                        │
//! │  │ • fetch_keys     │      │ • fetch_backup   │                        │
//! │  │ • check_keys_    │      │                  │                        │
//! │  │   exist          │      │ (opaque blobs,   │                        │
//! │  │ • create_or_get_ │      │  keyed by user)  │                        │
//! │  │   session        │      └──────────────────┘                        │
//! │  │ • fetch_session  │                                                  │
//! │  │ • rotate_session │                                                  │
//! │  └──────────────────┘                                                  │
//! │                                                                         │
//! │  Only public material ever crosses these interfaces: public key        │
//! │  bundles, signed ephemeral public keys, and password-wrapped           │
//! │  private-key blobs. The directory never sees a usable private key.     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The in-memory implementations back the test suite and demos; a real
//! deployment substitutes REST clients behind the same traits.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::crypto::PublicKeyBundle;
use crate::error::{Error, Result};
use crate::identity::WrappedPrivateKey;

/// How long an in-memory session lives before expiring
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// An ephemeral public key endorsed by its owner's identity signing key
///
/// The directory stores these verbatim; the counterparty verifies the
/// signature against the owner's published signing key before trusting
/// the ephemeral key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedEphemeralKey {
    /// Ephemeral ECDH public key (base64 SEC1)
    pub public_key: String,
    /// ECDSA signature over the base64 public key string (hex)
    pub signature: String,
}

/// A session as the directory sees it
///
/// Each side contributes one signed ephemeral key. A session where the
/// counterparty has not yet contributed theirs is usable for nothing but
/// waiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSession {
    /// Unique session identifier
    pub session_id: String,
    /// User who opened the session
    pub initiator_id: String,
    /// User the session was opened towards
    pub responder_id: String,
    /// Initiator's signed ephemeral key
    pub initiator_ephemeral: Option<SignedEphemeralKey>,
    /// Responder's signed ephemeral key (absent until they join)
    pub responder_ephemeral: Option<SignedEphemeralKey>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Authoritative expiry; expired sessions must be re-created
    pub expires_at: DateTime<Utc>,
}

impl RemoteSession {
    /// The counterparty's signed ephemeral key, from `my_id`'s perspective
    pub fn peer_ephemeral(&self, my_id: &str) -> Option<&SignedEphemeralKey> {
        if self.initiator_id == my_id {
            self.responder_ephemeral.as_ref()
        } else {
            self.initiator_ephemeral.as_ref()
        }
    }

    /// The counterparty's user id, from `my_id`'s perspective
    pub fn peer_id(&self, my_id: &str) -> &str {
        if self.initiator_id == my_id {
            &self.responder_id
        } else {
            &self.initiator_id
        }
    }

    /// Whether the session is past its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// The key directory service
///
/// Publishes and serves public key bundles, and brokers per-conversation
/// sessions between pairs of users.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Publish (or overwrite) a user's public key bundle
    async fn publish_keys(&self, bundle: &PublicKeyBundle) -> Result<()>;

    /// Fetch a user's public key bundle, `None` if they have none
    async fn fetch_keys(&self, user_id: &str) -> Result<Option<PublicKeyBundle>>;

    /// Check whether a user has published keys
    async fn check_keys_exist(&self, user_id: &str) -> Result<bool>;

    /// Get or create the session between `requester_id` and `other_user_id`
    ///
    /// Idempotent: if a live session already exists for this pair, it is
    /// returned with the requester's ephemeral key recorded on their side
    /// (first write wins; a repeat call does not replace it).
    async fn create_or_get_session(
        &self,
        requester_id: &str,
        other_user_id: &str,
        ephemeral: SignedEphemeralKey,
    ) -> Result<RemoteSession>;

    /// Fetch a session by id
    async fn fetch_session(&self, session_id: &str) -> Result<RemoteSession>;

    /// Replace the requester's ephemeral key on an existing session
    async fn rotate_session(
        &self,
        session_id: &str,
        requester_id: &str,
        new_ephemeral: SignedEphemeralKey,
    ) -> Result<RemoteSession>;
}

/// Server-side storage for password-wrapped key backups
///
/// Blobs are opaque to the store: they are AEAD ciphertext under a
/// password-derived key and useless without the password.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Store (or overwrite) a user's wrapped key backup
    async fn put_backup(&self, user_id: &str, wrapped: &WrappedPrivateKey) -> Result<()>;

    /// Fetch a user's wrapped key backup, `None` if they have none
    async fn fetch_backup(&self, user_id: &str) -> Result<Option<WrappedPrivateKey>>;
}

// ============================================================================
// IN-MEMORY IMPLEMENTATIONS
// ============================================================================

/// In-memory directory service for tests and demos
pub struct InMemoryDirectory {
    keys: Mutex<HashMap<String, PublicKeyBundle>>,
    sessions: Mutex<HashMap<String, RemoteSession>>,
    /// sorted (user, user) pair → live session id
    pair_index: Mutex<HashMap<(String, String), String>>,
    session_ttl: Duration,
}

impl InMemoryDirectory {
    /// Create an empty directory with the default session TTL
    pub fn new() -> Self {
        Self::with_session_ttl(Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }

    /// Create an empty directory with a custom session TTL
    pub fn with_session_ttl(session_ttl: Duration) -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            pair_index: Mutex::new(HashMap::new()),
            session_ttl,
        }
    }

    fn pair_key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryService for InMemoryDirectory {
    async fn publish_keys(&self, bundle: &PublicKeyBundle) -> Result<()> {
        let mut keys = self.keys.lock();
        keys.insert(bundle.user_id.clone(), bundle.clone());
        Ok(())
    }

    async fn fetch_keys(&self, user_id: &str) -> Result<Option<PublicKeyBundle>> {
        let keys = self.keys.lock();
        Ok(keys.get(user_id).cloned())
    }

    async fn check_keys_exist(&self, user_id: &str) -> Result<bool> {
        let keys = self.keys.lock();
        Ok(keys.contains_key(user_id))
    }

    async fn create_or_get_session(
        &self,
        requester_id: &str,
        other_user_id: &str,
        ephemeral: SignedEphemeralKey,
    ) -> Result<RemoteSession> {
        let now = crate::time::now();
        let pair = Self::pair_key(requester_id, other_user_id);

        let mut pair_index = self.pair_index.lock();
        let mut sessions = self.sessions.lock();

        if let Some(session_id) = pair_index.get(&pair) {
            if let Some(session) = sessions.get_mut(session_id) {
                if !session.is_expired(now) {
                    // Record the requester's side if they have not joined yet;
                    // a repeat call from the same side is a no-op.
                    if session.initiator_id == requester_id {
                        session.initiator_ephemeral.get_or_insert(ephemeral);
                    } else {
                        session.responder_ephemeral.get_or_insert(ephemeral);
                    }
                    return Ok(session.clone());
                }
            }
        }

        let session = RemoteSession {
            session_id: Uuid::new_v4().to_string(),
            initiator_id: requester_id.to_string(),
            responder_id: other_user_id.to_string(),
            initiator_ephemeral: Some(ephemeral),
            responder_ephemeral: None,
            created_at: now,
            expires_at: now + self.session_ttl,
        };

        pair_index.insert(pair, session.session_id.clone());
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(session)
    }

    async fn fetch_session(&self, session_id: &str) -> Result<RemoteSession> {
        let sessions = self.sessions.lock();
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::Directory(format!("Unknown session: {}", session_id)))
    }

    async fn rotate_session(
        &self,
        session_id: &str,
        requester_id: &str,
        new_ephemeral: SignedEphemeralKey,
    ) -> Result<RemoteSession> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::Directory(format!("Unknown session: {}", session_id)))?;

        if session.initiator_id == requester_id {
            session.initiator_ephemeral = Some(new_ephemeral);
        } else if session.responder_id == requester_id {
            session.responder_ephemeral = Some(new_ephemeral);
        } else {
            return Err(Error::Directory(format!(
                "User {} is not a participant of session {}",
                requester_id, session_id
            )));
        }

        Ok(session.clone())
    }
}

/// In-memory backup store for tests and demos
pub struct InMemoryBackupStore {
    blobs: Mutex<HashMap<String, WrappedPrivateKey>>,
}

impl InMemoryBackupStore {
    /// Create an empty backup store
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBackupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackupStore for InMemoryBackupStore {
    async fn put_backup(&self, user_id: &str, wrapped: &WrappedPrivateKey) -> Result<()> {
        let mut blobs = self.blobs.lock();
        blobs.insert(user_id.to_string(), wrapped.clone());
        Ok(())
    }

    async fn fetch_backup(&self, user_id: &str) -> Result<Option<WrappedPrivateKey>> {
        let blobs = self.blobs.lock();
        Ok(blobs.get(user_id).cloned())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::IdentityKeyPair;

    fn ephemeral(tag: &str) -> SignedEphemeralKey {
        SignedEphemeralKey {
            public_key: format!("pk-{}", tag),
            signature: format!("sig-{}", tag),
        }
    }

    #[tokio::test]
    async fn test_publish_and_fetch_keys() {
        let directory = InMemoryDirectory::new();
        let bundle = IdentityKeyPair::generate().public_bundle("alice");

        assert!(!directory.check_keys_exist("alice").await.unwrap());
        directory.publish_keys(&bundle).await.unwrap();

        assert!(directory.check_keys_exist("alice").await.unwrap());
        assert_eq!(directory.fetch_keys("alice").await.unwrap(), Some(bundle));
    }

    #[tokio::test]
    async fn test_session_is_idempotent_per_pair() {
        let directory = InMemoryDirectory::new();

        let s1 = directory
            .create_or_get_session("alice", "bob", ephemeral("alice"))
            .await
            .unwrap();
        // Bob joins the same session, contributing his side
        let s2 = directory
            .create_or_get_session("bob", "alice", ephemeral("bob"))
            .await
            .unwrap();

        assert_eq!(s1.session_id, s2.session_id);
        assert_eq!(s2.initiator_ephemeral, Some(ephemeral("alice")));
        assert_eq!(s2.responder_ephemeral, Some(ephemeral("bob")));
        assert_eq!(s2.peer_id("alice"), "bob");
        assert_eq!(
            s2.peer_ephemeral("alice"),
            Some(&ephemeral("bob"))
        );
    }

    #[tokio::test]
    async fn test_repeat_join_does_not_replace_ephemeral() {
        let directory = InMemoryDirectory::new();

        directory
            .create_or_get_session("alice", "bob", ephemeral("alice-1"))
            .await
            .unwrap();
        let s = directory
            .create_or_get_session("alice", "bob", ephemeral("alice-2"))
            .await
            .unwrap();

        assert_eq!(s.initiator_ephemeral, Some(ephemeral("alice-1")));
    }

    #[tokio::test]
    async fn test_expired_session_is_replaced() {
        let directory = InMemoryDirectory::with_session_ttl(Duration::seconds(-1));

        let s1 = directory
            .create_or_get_session("alice", "bob", ephemeral("a1"))
            .await
            .unwrap();
        let s2 = directory
            .create_or_get_session("alice", "bob", ephemeral("a2"))
            .await
            .unwrap();

        assert_ne!(s1.session_id, s2.session_id);
    }

    #[tokio::test]
    async fn test_rotate_replaces_only_requester_side() {
        let directory = InMemoryDirectory::new();

        let s = directory
            .create_or_get_session("alice", "bob", ephemeral("a1"))
            .await
            .unwrap();
        directory
            .create_or_get_session("bob", "alice", ephemeral("b1"))
            .await
            .unwrap();

        let rotated = directory
            .rotate_session(&s.session_id, "alice", ephemeral("a2"))
            .await
            .unwrap();

        assert_eq!(rotated.initiator_ephemeral, Some(ephemeral("a2")));
        assert_eq!(rotated.responder_ephemeral, Some(ephemeral("b1")));

        let err = directory
            .rotate_session(&s.session_id, "mallory", ephemeral("m1"))
            .await;
        assert!(err.is_err());
    }
}
