//! # Identity Module
//!
//! This module handles the lifecycle of a user's long-term identity keys:
//! generation, local persistence, publication to the directory, password-
//! wrapped backup, and the key-consistency reconciliation that repairs
//! divergence between this device and the directory.
//!
//! ## Identity Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         IDENTITY SYSTEM                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────┐             │
//! │  │  Cryptographic Identity                               │             │
//! │  │  ───────────────────────                               │             │
//! │  │                                                       │             │
//! │  │  ┌─────────────────┐   ┌─────────────────┐           │             │
//! │  │  │ Signing KeyPair │   │ Agreement       │           │             │
//! │  │  │ (ECDSA P-256)   │   │ KeyPair (ECDH)  │           │             │
//! │  │  │                 │   │                 │           │             │
//! │  │  │ • Sign messages │   │ • Key exchange  │           │             │
//! │  │  │ • Endorse       │   │ • Shared secret │           │             │
//! │  │  │   ephemerals    │   │   derivation    │           │             │
//! │  │  └─────────────────┘   └─────────────────┘           │             │
//! │  │                                                       │             │
//! │  └───────────────────────────────────────────────────────┘             │
//! │                                                                         │
//! │  Private keys:  SecureStore, this device only, never unencrypted       │
//! │                 off-device (backup is password-wrapped AEAD)           │
//! │  Public keys:   SecureStore + published to the directory; the          │
//! │                 reconciler keeps the two in agreement                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod backup;
mod reconcile;

pub use backup::{backup_to, restore_from, unwrap, wrap, WrappedPrivateKey};
pub use reconcile::{reconcile, ReconcileOutcome};

use std::sync::Arc;

use crate::crypto::{AgreementKeyPair, IdentityKeyPair, PublicKeyBundle, SigningKeyPair};
use crate::directory::DirectoryService;
use crate::error::{Error, Result};
use crate::storage::{names, SecureStore};

/// Manages the long-term identity keys for one user on one device
///
/// Wraps the [`SecureStore`] with the identity-specific persistence
/// policy: private and public halves are stored under stable logical
/// names, and private-key presence is all-or-nothing — a half-present
/// identity reads as absent and is repaired by the reconciler.
pub struct IdentityKeyStore {
    user_id: String,
    store: Arc<SecureStore>,
}

impl IdentityKeyStore {
    /// Create a key store for a user backed by the given secure store
    pub fn new(user_id: impl Into<String>, store: Arc<SecureStore>) -> Self {
        Self {
            user_id: user_id.into(),
            store,
        }
    }

    /// The user this store belongs to
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Generate a fresh identity, persist it locally, and publish the
    /// public bundle to the directory
    ///
    /// Side effect: overwrites any previous local identity for this user.
    pub async fn generate_and_persist(
        &self,
        directory: &dyn DirectoryService,
    ) -> Result<PublicKeyBundle> {
        let keypair = IdentityKeyPair::generate();
        let bundle = keypair.public_bundle(&self.user_id);

        self.store.store(
            &names::signing_private(&self.user_id),
            keypair.signing.secret_bytes().as_slice(),
        )?;
        self.store.store(
            &names::agreement_private(&self.user_id),
            keypair.agreement.secret_bytes().as_slice(),
        )?;
        self.store.store(
            &names::signing_public(&self.user_id),
            bundle.signing_public.as_bytes(),
        )?;
        self.store.store(
            &names::agreement_public(&self.user_id),
            bundle.agreement_public.as_bytes(),
        )?;

        directory.publish_keys(&bundle).await?;

        tracing::info!(user_id = %self.user_id, "Generated and published new identity keys");
        Ok(bundle)
    }

    /// Persist an existing identity keypair (backup restore path)
    ///
    /// Same local writes as [`generate_and_persist`](Self::generate_and_persist)
    /// but with caller-provided keys and no publication.
    pub fn persist(&self, keypair: &IdentityKeyPair) -> Result<PublicKeyBundle> {
        let bundle = keypair.public_bundle(&self.user_id);

        self.store.store(
            &names::signing_private(&self.user_id),
            keypair.signing.secret_bytes().as_slice(),
        )?;
        self.store.store(
            &names::agreement_private(&self.user_id),
            keypair.agreement.secret_bytes().as_slice(),
        )?;
        self.store.store(
            &names::signing_public(&self.user_id),
            bundle.signing_public.as_bytes(),
        )?;
        self.store.store(
            &names::agreement_public(&self.user_id),
            bundle.agreement_public.as_bytes(),
        )?;

        Ok(bundle)
    }

    /// Load both private keys, or `None` if the identity is absent
    ///
    /// Presence is all-or-nothing: if either key is missing the identity
    /// is treated as absent (not an error) and left to the reconciler.
    /// Unparseable key bytes are a corrupted store and do error.
    pub fn load_local_private_keys(&self) -> Result<Option<IdentityKeyPair>> {
        let signing = self.store.retrieve(&names::signing_private(&self.user_id))?;
        let agreement = self.store.retrieve(&names::agreement_private(&self.user_id))?;

        match (signing, agreement) {
            (Some(signing), Some(agreement)) => Ok(Some(IdentityKeyPair {
                signing: SigningKeyPair::from_bytes(&signing)?,
                agreement: AgreementKeyPair::from_bytes(&agreement)?,
            })),
            _ => Ok(None),
        }
    }

    /// Whether both private keys are present locally
    pub fn has_local_private_keys(&self) -> Result<bool> {
        Ok(self.store.exists(&names::signing_private(&self.user_id))?
            && self.store.exists(&names::agreement_private(&self.user_id))?)
    }

    /// Read the locally stored public keys without touching private material
    ///
    /// Returns `None` when either public key is missing — the reconciler
    /// translates that into [`Error::CannotRepublish`] on the branch that
    /// needs them.
    pub fn export_public_keys(&self) -> Result<Option<PublicKeyBundle>> {
        let signing = self.store.retrieve(&names::signing_public(&self.user_id))?;
        let agreement = self.store.retrieve(&names::agreement_public(&self.user_id))?;

        match (signing, agreement) {
            (Some(signing), Some(agreement)) => Ok(Some(PublicKeyBundle {
                user_id: self.user_id.clone(),
                signing_public: String::from_utf8(signing.to_vec())
                    .map_err(|_| Error::StorageCorrupted("signing public key".into()))?,
                agreement_public: String::from_utf8(agreement.to_vec())
                    .map_err(|_| Error::StorageCorrupted("agreement public key".into()))?,
            })),
            _ => Ok(None),
        }
    }

    /// Delete all local key material for this user. Irreversible.
    ///
    /// Called on logout.
    pub fn clear(&self) -> Result<()> {
        self.store.delete(&names::signing_private(&self.user_id))?;
        self.store.delete(&names::agreement_private(&self.user_id))?;
        self.store.delete(&names::signing_public(&self.user_id))?;
        self.store.delete(&names::agreement_public(&self.user_id))?;

        tracing::info!(user_id = %self.user_id, "Cleared local identity keys");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
