//! # Digital Signatures Module
//!
//! Provides ECDSA P-256 signatures for message authentication and integrity.
//!
//! ## Signature Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SIGNING FLOW                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SENDER                                                                │
//! │  ──────────────────────────────────────────────────────────────         │
//! │                                                                         │
//! │  1. Hash message with SHA-256                                          │
//! │  2. Sign hash with ECDSA private key                                   │
//! │  3. Produce 64-byte (r || s) signature                                 │
//! │                                                                         │
//! │  RECIPIENT                                                             │
//! │  ──────────────────────────────────────────────────────────────         │
//! │                                                                         │
//! │  verify(message, signature, sender_public_key) → true / false          │
//! │                                                                         │
//! │  Verification NEVER throws: malformed keys, malformed signatures,      │
//! │  and genuine mismatches all verify false. Callers decide whether       │
//! │  false is an error (the message cipher treats it as a potential        │
//! │  security event).                                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//!
//! | Property | Description |
//! |----------|-------------|
//! | Authenticity | Verifies the message came from the claimed sender |
//! | Integrity | Detects any modification to the signed message |
//! | Public Verification | Anyone with the public key can verify |

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::crypto::SigningKeyPair;
use crate::error::{Error, Result};

/// Size of a P-256 ECDSA signature in bytes (r || s)
pub const SIGNATURE_SIZE: usize = 64;

/// An ECDSA P-256 signature
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "signature_bytes")] pub [u8; SIGNATURE_SIZE]);

impl Signature {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice (must be exactly 64 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != SIGNATURE_SIZE {
            return Err(Error::InvalidKey(format!(
                "Signature must be {} bytes, got {}",
                SIGNATURE_SIZE,
                slice.len()
            )));
        }
        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    /// Encode as hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from hex string
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| Error::InvalidKey(format!("Invalid signature hex: {}", e)))?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Sign a message using ECDSA P-256 over SHA-256
///
/// ## Parameters
///
/// - `keypair`: The signing keypair (contains private key)
/// - `message`: The message to sign
///
/// ## Returns
///
/// A 64-byte (r || s) signature
pub fn sign(keypair: &SigningKeyPair, message: &[u8]) -> Signature {
    let sig: EcdsaSignature = keypair.signing_key().sign(message);

    let mut bytes = [0u8; SIGNATURE_SIZE];
    bytes.copy_from_slice(&sig.to_bytes());
    Signature(bytes)
}

/// Verify an ECDSA P-256 signature
///
/// ## Parameters
///
/// - `public_key`: The signer's public key (SEC1 uncompressed bytes)
/// - `message`: The signed message
/// - `signature`: The signature to verify
///
/// ## Returns
///
/// `true` only when the signature is valid for this message and key.
/// Malformed public keys and malformed signatures verify `false` — this
/// function never errors, so it is safe to call on untrusted input.
pub fn verify(public_key: &[u8], message: &[u8], signature: &Signature) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(public_key) else {
        return false;
    };

    let Ok(sig) = EcdsaSignature::from_slice(&signature.0) else {
        return false;
    };

    verifying_key.verify(message, &sig).is_ok()
}

/// Serde helper for signature bytes
mod signature_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 64], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<[u8; 64], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Invalid signature length"))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = SigningKeyPair::generate();
        let message = b"Hello, World!";

        let signature = sign(&keypair, message);
        assert!(verify(&keypair.public_bytes(), message, &signature));
    }

    #[test]
    fn test_verify_wrong_message_fails() {
        let keypair = SigningKeyPair::generate();

        let signature = sign(&keypair, b"Hello, World!");
        assert!(!verify(&keypair.public_bytes(), b"Wrong message!", &signature));
    }

    #[test]
    fn test_verify_wrong_key_fails() {
        let keypair1 = SigningKeyPair::generate();
        let keypair2 = SigningKeyPair::generate();
        let message = b"Hello, World!";

        let signature = sign(&keypair1, message);
        assert!(!verify(&keypair2.public_bytes(), message, &signature));
    }

    #[test]
    fn test_verify_never_panics_on_garbage() {
        let keypair = SigningKeyPair::generate();
        let signature = sign(&keypair, b"test");

        // Malformed public key: must verify false, not error
        assert!(!verify(b"garbage", b"test", &signature));
        assert!(!verify(&[0u8; 65], b"test", &signature));

        // All-zero signature bytes are not a valid (r, s) pair
        let bogus = Signature::from_bytes([0u8; SIGNATURE_SIZE]);
        assert!(!verify(&keypair.public_bytes(), b"test", &bogus));
    }

    #[test]
    fn test_tampered_signature_fails() {
        let keypair = SigningKeyPair::generate();
        let message = b"important message";

        let mut signature = sign(&keypair, message);
        signature.0[0] ^= 0xFF;

        assert!(!verify(&keypair.public_bytes(), message, &signature));
    }

    #[test]
    fn test_signature_hex_round_trip() {
        let keypair = SigningKeyPair::generate();
        let signature = sign(&keypair, b"test");

        let restored = Signature::from_hex(&signature.to_hex()).unwrap();
        assert_eq!(signature, restored);
    }

    #[test]
    fn test_signature_serialization() {
        let keypair = SigningKeyPair::generate();
        let signature = sign(&keypair, b"test");

        let json = serde_json::to_string(&signature).unwrap();
        let restored: Signature = serde_json::from_str(&json).unwrap();

        assert_eq!(signature, restored);
    }
}
