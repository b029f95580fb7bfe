//! # Session Module
//!
//! Ephemeral-key sessions: one short-lived ECDH pair per conversation,
//! endorsed by the long-term identity signing key.
//!
//! ## Session Establishment
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SESSION ESTABLISHMENT                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Alice                         Directory                       Bob     │
//! │  ─────                         ─────────                       ───     │
//! │                                                                         │
//! │  1. generate ephemeral ECDH pair                                       │
//! │  2. sign(ephemeral public, identity signing key)                       │
//! │  3. create_or_get_session ───►  stores Alice's signed key              │
//! │     store ephemeral private     returns session (Published)            │
//! │     under session_<id>_ecdh                                            │
//! │                                                                         │
//! │                                 ◄─── 4. Bob joins the same session     │
//! │                                      (idempotent get-or-create)        │
//! │                                                                         │
//! │  5. fetch_session ──────────►  both signed ephemerals present          │
//! │     verify Bob's signature      session is Active                      │
//! │     against Bob's published                                            │
//! │     signing key                                                        │
//! │                                                                         │
//! │  6. ECDH(my ephemeral private, their ephemeral public)                 │
//! │     → session secret (cached per pair)                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Machine
//!
//! `Uninitialized → EphemeralGenerated → Published → (Active |
//! RotationPending) → Expired`. An `Active` session may encrypt and decrypt
//! until `expires_at`; past that the next send must create a session again —
//! expiry is authoritative and nothing rotates implicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::crypto::{
    decode_public_key, sign, verify, AgreementKeyPair, EncryptionKey, IdentityKeyPair,
    SharedSecret, Signature,
};
use crate::directory::{DirectoryService, RemoteSession, SignedEphemeralKey};
use crate::error::{Error, Result};
use crate::secrets::{PairKey, SharedSecretManager};
use crate::storage::{names, SecureStore};

/// Session lifecycle states
///
/// `Uninitialized` is the absence of a session and has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Local ephemeral pair generated, not yet accepted by the directory
    EphemeralGenerated,
    /// Directory holds our signed ephemeral; counterparty has not joined
    Published,
    /// Both sides contributed; usable until `expires_at`
    Active,
    /// A replacement ephemeral has been generated, rotation not yet confirmed
    RotationPending,
    /// Past `expires_at`; the next send must create a new session
    Expired,
}

/// One conversation-scoped session, as seen from this device
///
/// The local ephemeral *private* key is never part of the record; it lives
/// in the secure store under `session_<id>_ecdh` and stays on this device.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Unique session identifier (directory-assigned)
    pub session_id: String,
    /// This device's user
    pub local_user_id: String,
    /// The counterparty
    pub peer_user_id: String,
    /// Our ephemeral public key (base64 SEC1)
    pub local_ephemeral_public: String,
    /// Counterparty's ephemeral public key, once they have joined
    pub remote_ephemeral_public: Option<String>,
    /// Counterparty's identity signing key (base64 SEC1)
    pub remote_signing_public: Option<String>,
    /// Lifecycle state
    pub state: SessionState,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Authoritative expiry
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the session is past its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The shared-secret cache slot for this conversation
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.local_user_id, &self.peer_user_id)
    }
}

/// Manages ephemeral session keys for one user
///
/// Owns generation, endorsement, and local persistence of per-session
/// ephemeral pairs, and derivation of session-scoped shared secrets
/// through the [`SharedSecretManager`].
pub struct SessionManager {
    user_id: String,
    store: Arc<SecureStore>,
    secrets: Arc<SharedSecretManager>,
    directory: Arc<dyn DirectoryService>,
}

impl SessionManager {
    /// Create a session manager
    pub fn new(
        user_id: impl Into<String>,
        store: Arc<SecureStore>,
        secrets: Arc<SharedSecretManager>,
        directory: Arc<dyn DirectoryService>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            store,
            secrets,
            directory,
        }
    }

    /// Establish (or rejoin) the session with another user
    ///
    /// Generates an ephemeral pair, signs its exported public key with the
    /// identity signing key, and submits it to the directory. The call is
    /// idempotent: if the directory already holds a live session for this
    /// pair it is returned as-is, and the freshly generated pair is only
    /// persisted when the directory actually accepted it as our side.
    pub async fn create_session(
        &self,
        identity: &IdentityKeyPair,
        other_user_id: &str,
    ) -> Result<SessionRecord> {
        let ephemeral = AgreementKeyPair::generate();
        let ephemeral_public = ephemeral.public_base64();

        let mut state = SessionState::EphemeralGenerated;
        tracing::debug!(user_id = %self.user_id, peer = other_user_id, ?state, "Generated ephemeral key pair");

        let signature = sign(&identity.signing, ephemeral_public.as_bytes());
        let signed = SignedEphemeralKey {
            public_key: ephemeral_public.clone(),
            signature: signature.to_hex(),
        };

        let remote = self
            .directory
            .create_or_get_session(&self.user_id, other_user_id, signed)
            .await?;
        state = SessionState::Published;

        // Only persist the new private key if the directory recorded our
        // fresh ephemeral; on an idempotent rejoin the previously stored
        // key stays authoritative.
        let my_side = my_ephemeral(&remote, &self.user_id)?;
        if my_side.public_key == ephemeral_public {
            self.store.store(
                &names::session_ephemeral(&remote.session_id),
                ephemeral.secret_bytes().as_slice(),
            )?;
        }

        let record = self.resolve(&remote).await?;
        tracing::info!(
            user_id = %self.user_id,
            session_id = %record.session_id,
            ?state,
            final_state = ?record.state,
            "Session established"
        );
        Ok(record)
    }

    /// Fetch the current state of a session from the directory
    pub async fn fetch_session(&self, session_id: &str) -> Result<SessionRecord> {
        let remote = self.directory.fetch_session(session_id).await?;
        self.resolve(&remote).await
    }

    /// Derive the session-scoped shared secret
    ///
    /// Loads this session's local ephemeral private key, performs ECDH
    /// against the counterparty's ephemeral public key, and converts the
    /// result to an AEAD key. Cached per conversation pair; concurrent
    /// derivations collapse.
    ///
    /// ## Errors
    ///
    /// [`Error::SessionNotFound`] when the local ephemeral private key is
    /// absent — this session was created on a different device.
    pub async fn derive_session_secret(
        &self,
        session_id: &str,
        peer_user_id: &str,
        remote_ephemeral_public: &str,
    ) -> Result<EncryptionKey> {
        let stored = self
            .store
            .retrieve(&names::session_ephemeral(session_id))?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        let local_ephemeral = AgreementKeyPair::from_bytes(&stored)?;
        let their_public = decode_public_key(remote_ephemeral_public)?;

        let pair = PairKey::new(&self.user_id, peer_user_id);
        let context = session_id.as_bytes().to_vec();

        self.secrets
            .get_or_derive(&pair, move || async move {
                let dh = local_ephemeral.diffie_hellman(&their_public)?;
                SharedSecret::from_bytes(dh).derive_key(&context)
            })
            .await
    }

    /// Rotate a session's ephemeral key
    ///
    /// Generates and signs a new ephemeral pair, submits the rotation, and
    /// invalidates the cached secret for this conversation so the next
    /// encrypt/decrypt derives under the rotated keys.
    pub async fn rotate_session(
        &self,
        identity: &IdentityKeyPair,
        session: &SessionRecord,
    ) -> Result<SessionRecord> {
        let ephemeral = AgreementKeyPair::generate();
        let ephemeral_public = ephemeral.public_base64();

        let state = SessionState::RotationPending;
        tracing::debug!(session_id = %session.session_id, ?state, "Submitting session rotation");

        let signature = sign(&identity.signing, ephemeral_public.as_bytes());
        let signed = SignedEphemeralKey {
            public_key: ephemeral_public,
            signature: signature.to_hex(),
        };

        let remote = self
            .directory
            .rotate_session(&session.session_id, &self.user_id, signed)
            .await?;

        self.store.store(
            &names::session_ephemeral(&remote.session_id),
            ephemeral.secret_bytes().as_slice(),
        )?;

        // Anything derived under the old ephemeral is stale now
        self.secrets.invalidate(&session.pair_key());

        let record = self.resolve(&remote).await?;
        tracing::info!(session_id = %record.session_id, "Session rotated");
        Ok(record)
    }

    /// Build a local [`SessionRecord`] from the directory's view,
    /// verifying the counterparty's ephemeral endorsement
    async fn resolve(&self, remote: &RemoteSession) -> Result<SessionRecord> {
        let peer_id = remote.peer_id(&self.user_id).to_string();
        let my_side = my_ephemeral(remote, &self.user_id)?;

        let peer_side = remote.peer_ephemeral(&self.user_id);
        let mut remote_ephemeral_public = None;
        let mut remote_signing_public = None;

        if let Some(peer_ephemeral) = peer_side {
            let peer_bundle = self
                .directory
                .fetch_keys(&peer_id)
                .await?
                .ok_or_else(|| {
                    Error::Directory(format!("User {} has no published keys", peer_id))
                })?;

            // The ephemeral key is only trusted with a valid endorsement
            // from the peer's long-term signing key.
            let signature = Signature::from_hex(&peer_ephemeral.signature)
                .map_err(|_| Error::SignatureInvalid)?;
            let peer_signing = peer_bundle.signing_public_bytes()?;

            if !verify(
                &peer_signing,
                peer_ephemeral.public_key.as_bytes(),
                &signature,
            ) {
                tracing::warn!(
                    session_id = %remote.session_id,
                    peer = %peer_id,
                    "Peer ephemeral key failed signature verification"
                );
                return Err(Error::SignatureInvalid);
            }

            remote_ephemeral_public = Some(peer_ephemeral.public_key.clone());
            remote_signing_public = Some(peer_bundle.signing_public.clone());
        }

        let now = crate::time::now();
        let state = if remote.is_expired(now) {
            SessionState::Expired
        } else if remote_ephemeral_public.is_some() {
            SessionState::Active
        } else {
            SessionState::Published
        };

        Ok(SessionRecord {
            session_id: remote.session_id.clone(),
            local_user_id: self.user_id.clone(),
            peer_user_id: peer_id,
            local_ephemeral_public: my_side.public_key.clone(),
            remote_ephemeral_public,
            remote_signing_public,
            state,
            created_at: remote.created_at,
            expires_at: remote.expires_at,
        })
    }
}

/// This user's side of a remote session
fn my_ephemeral<'a>(remote: &'a RemoteSession, user_id: &str) -> Result<&'a SignedEphemeralKey> {
    let side = if remote.initiator_id == user_id {
        remote.initiator_ephemeral.as_ref()
    } else {
        remote.responder_ephemeral.as_ref()
    };

    side.ok_or_else(|| Error::SessionNotFound(remote.session_id.clone()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::identity::IdentityKeyStore;
    use chrono::Duration;

    struct Party {
        identity: IdentityKeyPair,
        sessions: SessionManager,
        secrets: Arc<SharedSecretManager>,
    }

    async fn party(user_id: &str, directory: &Arc<InMemoryDirectory>) -> Party {
        let store = Arc::new(SecureStore::new());
        let secrets = Arc::new(SharedSecretManager::new());
        let key_store = IdentityKeyStore::new(user_id, store.clone());
        key_store
            .generate_and_persist(directory.as_ref())
            .await
            .unwrap();
        let identity = key_store.load_local_private_keys().unwrap().unwrap();

        Party {
            identity,
            sessions: SessionManager::new(
                user_id,
                store,
                secrets.clone(),
                directory.clone() as Arc<dyn DirectoryService>,
            ),
            secrets,
        }
    }

    #[tokio::test]
    async fn test_session_before_peer_joins_is_published() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = party("alice", &directory).await;

        let session = alice
            .sessions
            .create_session(&alice.identity, "bob")
            .await
            .unwrap();

        assert_eq!(session.state, SessionState::Published);
        assert!(session.remote_ephemeral_public.is_none());
    }

    #[tokio::test]
    async fn test_both_sides_derive_equal_secrets() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = party("alice", &directory).await;
        let bob = party("bob", &directory).await;

        alice
            .sessions
            .create_session(&alice.identity, "bob")
            .await
            .unwrap();
        let bob_session = bob
            .sessions
            .create_session(&bob.identity, "alice")
            .await
            .unwrap();
        let alice_session = alice
            .sessions
            .fetch_session(&bob_session.session_id)
            .await
            .unwrap();

        assert_eq!(alice_session.state, SessionState::Active);
        assert_eq!(bob_session.state, SessionState::Active);

        let alice_secret = alice
            .sessions
            .derive_session_secret(
                &alice_session.session_id,
                "bob",
                alice_session.remote_ephemeral_public.as_ref().unwrap(),
            )
            .await
            .unwrap();
        let bob_secret = bob
            .sessions
            .derive_session_secret(
                &bob_session.session_id,
                "alice",
                bob_session.remote_ephemeral_public.as_ref().unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(alice_secret.as_inner(), bob_secret.as_inner());
    }

    #[tokio::test]
    async fn test_create_session_is_idempotent() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = party("alice", &directory).await;

        let s1 = alice
            .sessions
            .create_session(&alice.identity, "bob")
            .await
            .unwrap();
        let s2 = alice
            .sessions
            .create_session(&alice.identity, "bob")
            .await
            .unwrap();

        assert_eq!(s1.session_id, s2.session_id);
        // The original ephemeral stays authoritative on rejoin
        assert_eq!(s1.local_ephemeral_public, s2.local_ephemeral_public);
    }

    #[tokio::test]
    async fn test_missing_local_ephemeral_is_session_not_found() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = party("alice", &directory).await;
        let bob = party("bob", &directory).await;

        let session = alice
            .sessions
            .create_session(&alice.identity, "bob")
            .await
            .unwrap();
        bob.sessions
            .create_session(&bob.identity, "alice")
            .await
            .unwrap();

        // A different device for alice: same user, empty local store
        let other_device = SessionManager::new(
            "alice",
            Arc::new(SecureStore::new()),
            Arc::new(SharedSecretManager::new()),
            directory.clone() as Arc<dyn DirectoryService>,
        );

        let refreshed = other_device.fetch_session(&session.session_id).await.unwrap();
        let result = other_device
            .derive_session_secret(
                &refreshed.session_id,
                "bob",
                refreshed.remote_ephemeral_public.as_ref().unwrap(),
            )
            .await;

        assert!(matches!(result, Err(Error::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_rotation_changes_secret_and_invalidates_cache() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = party("alice", &directory).await;
        let bob = party("bob", &directory).await;

        alice
            .sessions
            .create_session(&alice.identity, "bob")
            .await
            .unwrap();
        let bob_session = bob
            .sessions
            .create_session(&bob.identity, "alice")
            .await
            .unwrap();
        let alice_session = alice
            .sessions
            .fetch_session(&bob_session.session_id)
            .await
            .unwrap();

        let old_secret = alice
            .sessions
            .derive_session_secret(
                &alice_session.session_id,
                "bob",
                alice_session.remote_ephemeral_public.as_ref().unwrap(),
            )
            .await
            .unwrap();

        let rotated = alice
            .sessions
            .rotate_session(&alice.identity, &alice_session)
            .await
            .unwrap();
        assert!(!alice.secrets.is_cached(&alice_session.pair_key()));

        let new_secret = alice
            .sessions
            .derive_session_secret(
                &rotated.session_id,
                "bob",
                rotated.remote_ephemeral_public.as_ref().unwrap(),
            )
            .await
            .unwrap();

        assert_ne!(old_secret.as_inner(), new_secret.as_inner());
    }

    #[tokio::test]
    async fn test_expired_session_resolves_expired() {
        let directory = Arc::new(InMemoryDirectory::with_session_ttl(Duration::seconds(-1)));
        let alice = party("alice", &directory).await;

        let session = alice
            .sessions
            .create_session(&alice.identity, "bob")
            .await
            .unwrap();

        assert_eq!(session.state, SessionState::Expired);
    }

    #[tokio::test]
    async fn test_forged_peer_ephemeral_is_rejected() {
        let directory = Arc::new(InMemoryDirectory::new());
        let alice = party("alice", &directory).await;
        let bob = party("bob", &directory).await;

        alice
            .sessions
            .create_session(&alice.identity, "bob")
            .await
            .unwrap();
        let bob_session = bob
            .sessions
            .create_session(&bob.identity, "alice")
            .await
            .unwrap();

        // An attacker replaces bob's ephemeral with one signed by the
        // wrong key
        let mallory = IdentityKeyPair::generate();
        let forged_public = AgreementKeyPair::generate().public_base64();
        let forged_sig = sign(&mallory.signing, forged_public.as_bytes());
        directory
            .rotate_session(
                &bob_session.session_id,
                "bob",
                SignedEphemeralKey {
                    public_key: forged_public,
                    signature: forged_sig.to_hex(),
                },
            )
            .await
            .unwrap();

        let result = alice.sessions.fetch_session(&bob_session.session_id).await;
        assert!(matches!(result, Err(Error::SignatureInvalid)));
    }
}
