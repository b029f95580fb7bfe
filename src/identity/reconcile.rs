//! # Key-Consistency Reconciliation
//!
//! Detects and repairs divergence between this device's local keys and the
//! keys published to the directory. Runs once per authenticated session
//! start, before any session or message work.
//!
//! ## Repair Table
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    RECONCILIATION DECISION TABLE                        │
//! ├──────────┬──────────┬───────────────────────────────────────────────────┤
//! │  Local   │  Remote  │  Action                                           │
//! ├──────────┼──────────┼───────────────────────────────────────────────────┤
//! │  absent  │  absent  │  First-time: generate identity, publish           │
//! │  present │  absent  │  Re-publish local public keys unchanged           │
//! │  absent  │  present │  Fatal: MissingPrivateKey (restore from backup)   │
//! │  present │  present │  mismatch → overwrite remote with local           │
//! │          │          │  match    → no-op, but invalidate cache anyway    │
//! └──────────┴──────────┴───────────────────────────────────────────────────┘
//! ```
//!
//! Two rules dominate every branch:
//!
//! - **Never regenerate over an existing identity.** Regenerating would
//!   orphan all message history encrypted under the old keys. The absent/
//!   present branch therefore fails loudly instead of "helpfully" minting
//!   fresh keys, and the corrupted-store case refuses to republish.
//! - **The local device is the source of truth.** On mismatch the remote
//!   copy is overwritten, and every cached shared secret is dropped so
//!   nothing derived under pre-reconciliation keys survives.

use crate::directory::DirectoryService;
use crate::error::{Error, Result};
use crate::identity::IdentityKeyStore;
use crate::secrets::SharedSecretManager;

/// What the reconciler did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No keys anywhere: a new identity was generated and published
    GeneratedNew,
    /// Local keys existed but the directory had none: re-published unchanged
    Republished,
    /// Local and remote diverged: remote overwritten with local
    RemoteOverwritten,
    /// Local and remote already agreed
    Verified,
}

/// Reconcile local key state against the directory
///
/// On success the directory and the local store agree, and the
/// shared-secret cache holds nothing derived before that agreement was
/// established. On [`Error::MissingPrivateKey`] / [`Error::CannotRepublish`]
/// the device cannot proceed and the user must restore a backup.
pub async fn reconcile(
    identity: &IdentityKeyStore,
    secrets: &SharedSecretManager,
    directory: &dyn DirectoryService,
) -> Result<ReconcileOutcome> {
    let user_id = identity.user_id().to_string();

    let has_local = identity.has_local_private_keys()?;
    let has_remote = directory.check_keys_exist(&user_id).await?;

    tracing::info!(
        user_id = %user_id,
        local = has_local,
        remote = has_remote,
        "Reconciling key state"
    );

    match (has_local, has_remote) {
        // First-time initialization (registration)
        (false, false) => {
            tracing::info!(user_id = %user_id, "No keys found; generating first-time identity");
            identity.generate_and_persist(directory).await?;
            Ok(ReconcileOutcome::GeneratedNew)
        }

        // Directory lost our keys (or never got them): push local publics.
        // Regenerating here would orphan message history, so a corrupted
        // local store is a hard stop rather than a trigger to re-key.
        (true, false) => {
            let bundle = identity
                .export_public_keys()?
                .ok_or(Error::CannotRepublish)?;

            directory.publish_keys(&bundle).await?;
            secrets.invalidate_all();

            tracing::info!(user_id = %user_id, "Re-published local public keys (no regeneration)");
            Ok(ReconcileOutcome::Republished)
        }

        // New device (or wiped store) against an established account:
        // private keys are unrecoverable from a public-only directory.
        (false, true) => {
            tracing::warn!(
                user_id = %user_id,
                "Directory has keys but local private keys are missing; backup restore required"
            );
            Err(Error::MissingPrivateKey)
        }

        // Both present: verify they actually match
        (true, true) => {
            let local = identity
                .export_public_keys()?
                .ok_or(Error::CannotRepublish)?;
            let remote = directory
                .fetch_keys(&user_id)
                .await?
                .ok_or_else(|| Error::Directory("Published keys disappeared mid-reconcile".into()))?;

            let signing_match = local.signing_public == remote.signing_public;
            let agreement_match = local.agreement_public == remote.agreement_public;

            if !signing_match || !agreement_match {
                tracing::warn!(
                    user_id = %user_id,
                    signing_match,
                    agreement_match,
                    "Published keys diverged from local; overwriting remote with local"
                );

                directory.publish_keys(&local).await?;
                secrets.invalidate_all();
                return Ok(ReconcileOutcome::RemoteOverwritten);
            }

            // Even on a match, drop cached secrets: anything derived before
            // this verification ran may predate a repair on the other side.
            secrets.invalidate_all();

            tracing::info!(user_id = %user_id, "Keys verified; shared-secret cache cleared");
            Ok(ReconcileOutcome::Verified)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
