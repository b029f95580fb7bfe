//! # Shared-Secret Manager
//!
//! Derives and caches the symmetric keys shared between pairs of
//! identities (or pairs of session ephemeral keys).
//!
//! ## Cache Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    SHARED-SECRET CACHE                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  PairKey = lexicographically sorted participant ids ("alice-bob")      │
//! │                                                                         │
//! │  pair key ──► Arc<OnceCell<CacheEntry>>                                │
//! │                      │                                                  │
//! │                      ├── empty: first caller runs the derivation,      │
//! │                      │   concurrent callers await the same cell        │
//! │                      │   (at most one derivation in flight per key)    │
//! │                      │                                                  │
//! │                      └── filled: derived AEAD key + derivation time    │
//! │                                                                         │
//! │  invalidate(pair) / invalidate_all() remove cells from the map.        │
//! │  A derivation still in flight on a removed cell completes into the     │
//! │  detached cell and is discarded — it can never repopulate the live     │
//! │  cache after a logout or key repair.                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both parties converge on the same cache slot *content* by construction:
//! each side derives from its own private key and the other's public key,
//! and ECDH symmetry makes the results equal. The cache must never be
//! trusted over fresh directory data — on any mismatch the entry is
//! dropped and re-derived (correctness over performance).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use zeroize::ZeroizeOnDrop;

use crate::crypto::{AgreementKeyPair, EncryptionKey, SharedSecret};
use crate::error::{Error, Result};

/// Order-independent identifier for a pair of participants
///
/// Both sides of a conversation compute the same `PairKey` regardless of
/// who is "me" and who is "them".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey(String);

impl PairKey {
    /// Build the key for a pair of participant ids
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(format!("{}-{}", a, b))
        } else {
            Self(format!("{}-{}", b, a))
        }
    }

    /// The canonical string form (also used as the KDF context)
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A cached derived key
#[derive(ZeroizeOnDrop)]
struct CacheEntry {
    key_bytes: [u8; 32],
    #[zeroize(skip)]
    derived_at: DateTime<Utc>,
}

/// Derives and caches pair-scoped symmetric keys
///
/// Owned by the application root ([`crate::VelumCore`]) and shared by the
/// send path, receive path, and reconciler. Deriving an ECDH secret is
/// comparatively expensive and conversation-scoped, so caching amortizes
/// it; invalidation is explicit and always wins over the cache.
pub struct SharedSecretManager {
    entries: Mutex<HashMap<PairKey, Arc<OnceCell<CacheEntry>>>>,
}

impl SharedSecretManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached key for `pair`, deriving it via `derive` on a miss
    ///
    /// Concurrent calls for the same pair collapse into a single in-flight
    /// derivation: the first caller runs `derive`, the rest await its
    /// result. A failed derivation leaves the slot empty so the next call
    /// retries.
    pub async fn get_or_derive<F, Fut>(&self, pair: &PairKey, derive: F) -> Result<EncryptionKey>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<EncryptionKey>>,
    {
        let cell = {
            let mut entries = self.entries.lock();
            entries
                .entry(pair.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let entry = cell
            .get_or_try_init(|| async {
                let key = derive().await?;
                Ok::<_, Error>(CacheEntry {
                    key_bytes: key.as_inner(),
                    derived_at: crate::time::now(),
                })
            })
            .await?;

        Ok(EncryptionKey::from_bytes(entry.key_bytes))
    }

    /// Derive (or fetch cached) the pair secret from an agreement keypair
    /// and the counterparty's public key
    ///
    /// The derived AEAD key is bound to the pair via the KDF context, so
    /// both sides produce the same key from their own private halves.
    pub async fn pair_secret(
        &self,
        pair: &PairKey,
        my_agreement: &AgreementKeyPair,
        their_public: &[u8],
    ) -> Result<EncryptionKey> {
        let context = pair.as_str().as_bytes().to_vec();
        self.get_or_derive(pair, move || async move {
            let dh = my_agreement.diffie_hellman(their_public)?;
            SharedSecret::from_bytes(dh).derive_key(&context)
        })
        .await
    }

    /// Drop the entry for a pair
    ///
    /// Called whenever a decrypt using the cached entry fails (before the
    /// one-time re-derive retry) and whenever a key-mismatch repair runs.
    pub fn invalidate(&self, pair: &PairKey) {
        let mut entries = self.entries.lock();
        if entries.remove(pair).is_some() {
            tracing::debug!(pair = pair.as_str(), "Invalidated shared-secret cache entry");
        }
    }

    /// Drop every entry — logout and reconciliation path
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        if count > 0 {
            tracing::debug!(count, "Cleared shared-secret cache");
        }
    }

    /// Whether a derived key is currently cached for this pair
    pub fn is_cached(&self, pair: &PairKey) -> bool {
        let entries = self.entries.lock();
        entries.get(pair).is_some_and(|cell| cell.get().is_some())
    }

    /// When the cached entry for this pair was derived
    pub fn derived_at(&self, pair: &PairKey) -> Option<DateTime<Utc>> {
        let entries = self.entries.lock();
        entries
            .get(pair)
            .and_then(|cell| cell.get())
            .map(|entry| entry.derived_at)
    }

    /// Number of populated cache entries
    pub fn len(&self) -> usize {
        let entries = self.entries.lock();
        entries.values().filter(|cell| cell.get().is_some()).count()
    }

    /// Whether the cache holds no populated entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SharedSecretManager {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
