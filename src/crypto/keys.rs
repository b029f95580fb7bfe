//! # Key Management
//!
//! This module handles cryptographic key generation and management.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SigningKeyPair (ECDSA P-256)                                   │   │
//! │  │  ────────────────────────────                                    │   │
//! │  │                                                                  │   │
//! │  │  Purpose:                                                       │   │
//! │  │  • Proving identity (signing envelopes)                         │   │
//! │  │  • Authenticating ephemeral session keys                        │   │
//! │  │                                                                  │   │
//! │  │  Format:                                                        │   │
//! │  │  • Private key: 32-byte scalar (kept secret)                   │   │
//! │  │  • Public key: 65-byte SEC1 uncompressed point                 │   │
//! │  │                                                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  AgreementKeyPair (ECDH P-256)                                  │   │
//! │  │  ─────────────────────────────                                   │   │
//! │  │                                                                  │   │
//! │  │  Purpose:                                                       │   │
//! │  │  • Key exchange with peers (ECDH)                               │   │
//! │  │  • Deriving shared secrets for E2E encryption                   │   │
//! │  │                                                                  │   │
//! │  │  Used both as the long-term identity agreement key and as       │   │
//! │  │  per-session ephemeral keys.                                    │   │
//! │  │                                                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  IdentityKeyPair (Combined)                                     │   │
//! │  │  ──────────────────────────                                      │   │
//! │  │                                                                  │   │
//! │  │  Contains both signing and agreement keypairs.                  │   │
//! │  │  This is the main key structure for a user's identity.          │   │
//! │  │                                                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{ecdh, PublicKey as P256PublicKey, SecretKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroizing, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Size of a private key scalar in bytes (256 bits)
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Size of a SEC1 uncompressed public key in bytes (0x04 || x || y)
pub const PUBLIC_KEY_SIZE: usize = 65;

/// Combined keypair containing both signing and agreement keys
///
/// ## Security
///
/// - Private scalars are zeroized when this struct is dropped
/// - Public keys can be safely shared with anyone
/// - Private keys never leave the device unencrypted
#[derive(ZeroizeOnDrop)]
pub struct IdentityKeyPair {
    /// ECDSA keypair for signing
    pub signing: SigningKeyPair,
    /// ECDH keypair for key agreement
    pub agreement: AgreementKeyPair,
}

impl IdentityKeyPair {
    /// Generate a new random identity keypair
    ///
    /// Uses the operating system's secure random number generator.
    pub fn generate() -> Self {
        Self {
            signing: SigningKeyPair::generate(),
            agreement: AgreementKeyPair::generate(),
        }
    }

    /// Get the public keys for publishing to the directory
    pub fn public_bundle(&self, user_id: &str) -> PublicKeyBundle {
        PublicKeyBundle {
            user_id: user_id.to_string(),
            signing_public: self.signing.public_base64(),
            agreement_public: self.agreement.public_base64(),
        }
    }
}

/// ECDSA P-256 signing keypair
#[derive(ZeroizeOnDrop)]
pub struct SigningKeyPair {
    /// Private signing key (secret)
    #[zeroize(skip)] // p256::ecdsa::SigningKey zeroizes its scalar on drop
    secret: SigningKey,
}

impl SigningKeyPair {
    /// Generate a new random signing keypair
    pub fn generate() -> Self {
        let secret = SigningKey::random(&mut OsRng);
        Self { secret }
    }

    /// Create from a raw 32-byte scalar
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SigningKey::from_slice(bytes)
            .map_err(|e| Error::InvalidKey(format!("Invalid signing private key: {}", e)))?;
        Ok(Self { secret })
    }

    /// Get the secret scalar bytes (for secure storage only)
    ///
    /// ## Security Warning
    ///
    /// Only use this for secure storage or password-wrapped backup.
    /// Never log or transmit these bytes.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_SIZE]> {
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        out.copy_from_slice(&self.secret.to_bytes());
        out
    }

    /// Get the public key as SEC1 uncompressed bytes
    pub fn public_bytes(&self) -> Vec<u8> {
        VerifyingKey::from(&self.secret)
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// Get the public key as base64 (directory wire encoding)
    pub fn public_base64(&self) -> String {
        BASE64.encode(self.public_bytes())
    }

    /// Get reference to the signing key
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.secret
    }
}

/// ECDH P-256 keypair for key agreement
#[derive(ZeroizeOnDrop)]
pub struct AgreementKeyPair {
    /// Private agreement key (secret)
    #[zeroize(skip)] // p256::SecretKey zeroizes its scalar on drop
    secret: SecretKey,
    /// Public agreement key (derived from secret)
    #[zeroize(skip)]
    public: P256PublicKey,
}

impl AgreementKeyPair {
    /// Generate a new random agreement keypair
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Create from a raw 32-byte scalar
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| Error::InvalidKey(format!("Invalid agreement private key: {}", e)))?;
        let public = secret.public_key();
        Ok(Self { secret, public })
    }

    /// Get the secret scalar bytes (for secure storage only)
    ///
    /// ## Security Warning
    ///
    /// Only use this for secure storage or password-wrapped backup.
    /// Never log or transmit these bytes.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_SIZE]> {
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        out.copy_from_slice(&self.secret.to_bytes());
        out
    }

    /// Get the public key as SEC1 uncompressed bytes
    pub fn public_bytes(&self) -> Vec<u8> {
        self.public.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Get the public key as base64 (directory wire encoding)
    pub fn public_base64(&self) -> String {
        BASE64.encode(self.public_bytes())
    }

    /// Perform Diffie-Hellman key agreement
    ///
    /// Returns the raw shared secret that both parties can compute:
    /// - Alice: alice_secret × bob_public
    /// - Bob: bob_secret × alice_public
    ///
    /// Both computations produce the same shared secret. The raw output
    /// must be passed through a KDF before use as an AEAD key
    /// (see [`crate::crypto::SharedSecret`]).
    pub fn diffie_hellman(&self, their_public: &[u8]) -> Result<[u8; 32]> {
        let their_public = P256PublicKey::from_sec1_bytes(their_public)
            .map_err(|e| Error::Agreement(format!("Invalid peer public key: {}", e)))?;

        let shared = ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), their_public.as_affine());

        let mut out = [0u8; 32];
        out.copy_from_slice(shared.raw_secret_bytes().as_slice());
        Ok(out)
    }
}

/// Public keys that can be safely shared with others
///
/// This is the server-visible projection of an [`IdentityKeyPair`]: it
/// contains only public information and can be serialized, transmitted,
/// and stored without security concerns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicKeyBundle {
    /// Owner of these keys
    #[serde(rename = "userId")]
    pub user_id: String,

    /// ECDSA public key for signature verification (base64 SEC1)
    #[serde(rename = "ecdsaPublicKey")]
    pub signing_public: String,

    /// ECDH public key for key agreement (base64 SEC1)
    #[serde(rename = "ecdhPublicKey")]
    pub agreement_public: String,
}

impl PublicKeyBundle {
    /// Decode the signing public key to SEC1 bytes
    pub fn signing_public_bytes(&self) -> Result<Vec<u8>> {
        decode_public_key(&self.signing_public)
    }

    /// Decode the agreement public key to SEC1 bytes
    pub fn agreement_public_bytes(&self) -> Result<Vec<u8>> {
        decode_public_key(&self.agreement_public)
    }
}

/// Decode a base64 public key, validating its length
pub fn decode_public_key(encoded: &str) -> Result<Vec<u8>> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| Error::InvalidKey(format!("Invalid public key base64: {}", e)))?;

    if bytes.len() != PUBLIC_KEY_SIZE {
        return Err(Error::InvalidKey(format!(
            "Public key must be {} bytes, got {}",
            PUBLIC_KEY_SIZE,
            bytes.len()
        )));
    }

    Ok(bytes)
}

// ============================================================================
// TESTS
// ============================================================================
