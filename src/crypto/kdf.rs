//! # Key Derivation Functions
//!
//! This module provides key derivation for password-wrapped key backup
//! and the HKDF domain-separation constants used across the crate.
//!
//! ## Password Key Derivation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 PASSWORD → WRAPPING KEY                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  PBKDF2-HMAC-SHA256(                                                   │
//! │    password = user password (UTF-8),                                   │
//! │    salt = 16 random bytes, fresh per wrap, never reused,              │
//! │    iterations = 100_000,                                              │
//! │    output_length = 32 bytes                                           │
//! │  )                                                                     │
//! │                                                                         │
//! │  → AES-256-GCM wrapping key                                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Considerations
//!
//! | Aspect | Design Choice | Rationale |
//! |--------|---------------|-----------|
//! | KDF Algorithm | PBKDF2-HMAC-SHA256 | Well-analyzed, ubiquitous |
//! | Iterations | 100,000 | Slows offline guessing |
//! | Salt | 128-bit random per wrap | Defeats precomputation |
//! | Key Separation | Distinct HKDF `info` strings | Prevents cross-purpose reuse |

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::crypto::encryption::{EncryptionKey, KEY_SIZE};

/// Default PBKDF2 iteration count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Size of a PBKDF2 salt in bytes (128 bits)
pub const SALT_SIZE: usize = 16;

/// Domain separation strings for HKDF
///
/// These ensure that keys derived for different purposes are cryptographically
/// independent, even when derived from the same input material.
pub mod domain {
    /// Domain for AEAD keys derived from ECDH shared secrets
    pub const SHARED_SECRET: &[u8] = b"velum-shared-secret-v1";
}

/// Generate a fresh random salt for password key derivation
///
/// A new salt must be generated for every wrap operation; salts are
/// stored alongside the wrapped ciphertext and never reused.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive an AES-256-GCM key from a password and salt
///
/// This is deliberately slow: the iteration count is the only thing
/// standing between a stolen backup blob and an offline password guess.
pub fn derive_key_from_password(password: &str, salt: &[u8], iterations: u32) -> EncryptionKey {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    EncryptionKey::from_bytes(key)
}

// ============================================================================
// TESTS
// ============================================================================
