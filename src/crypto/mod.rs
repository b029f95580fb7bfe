//! # Cryptography Module
//!
//! This module provides all cryptographic primitives used by Velum Core.
//! Everything here is a thin, stateless wrapper over audited RustCrypto
//! implementations — no custom cryptography.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    KEY HIERARCHY                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  Identity (generated on first registration)                     │   │
//! │  │            ┌─────────────┴─────────────┐                       │   │
//! │  │            ▼                           ▼                       │   │
//! │  │  ┌─────────────────┐         ┌─────────────────┐              │   │
//! │  │  │  Signing Key    │         │ Agreement Key   │              │   │
//! │  │  │  (ECDSA P-256)  │         │ (ECDH P-256)    │              │   │
//! │  │  │                 │         │                 │              │   │
//! │  │  │ • Envelope sigs │         │ • Shared secret │              │   │
//! │  │  │ • Ephemeral key │         │   derivation    │              │   │
//! │  │  │   endorsement   │         │                 │              │   │
//! │  │  └─────────────────┘         └─────────────────┘              │   │
//! │  │                                                                 │   │
//! │  │  Per-conversation ephemeral ECDH pairs are generated by the     │   │
//! │  │  session manager and endorsed by the identity signing key.      │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 ENCRYPTION SCHEME                               │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  1. Key Exchange: ECDH P-256                                   │   │
//! │  │     my private × their public = shared secret                  │   │
//! │  │                                                                 │   │
//! │  │  2. Key Derivation: HKDF-SHA256                                │   │
//! │  │     shared secret → AES-256-GCM key                            │   │
//! │  │                                                                 │   │
//! │  │  3. Encryption: AES-256-GCM                                    │   │
//! │  │     • 256-bit key                                              │   │
//! │  │     • 96-bit IV (random per message, never caller-supplied)    │   │
//! │  │     • 128-bit authentication tag                               │   │
//! │  │                                                                 │   │
//! │  │  4. Authentication: ECDSA P-256 / SHA-256                      │   │
//! │  │     signature over {sender, receiver, iv, ciphertext}          │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | ECDSA P-256 | Signing | WebCrypto-compatible, widely audited |
//! | ECDH P-256 | Key Exchange | Same curve family as signing keys |
//! | AES-256-GCM | Encryption | Hardware acceleration, AEAD |
//! | HKDF-SHA256 | Key Derivation | Industry standard, well-analyzed |
//! | PBKDF2-SHA256 | Password KDF | Ubiquitous, tunable work factor |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: All secret keys are zeroized when dropped
//! 2. **Secure Random**: Using `rand::rngs::OsRng` for cryptographic randomness
//! 3. **No Nonce Reuse**: Fresh IV for every encryption operation
//! 4. **Infallible Verify**: Signature verification returns `false` on any
//!    malformed input rather than erroring

mod keys;
mod encryption;
mod signing;
mod kdf;

pub use keys::{
    decode_public_key, AgreementKeyPair, IdentityKeyPair, PublicKeyBundle, SigningKeyPair,
    PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE,
};
pub use encryption::{
    decrypt, encrypt, EncryptionKey, Nonce, SharedSecret, KEY_SIZE, NONCE_SIZE, TAG_SIZE,
};
pub use signing::{sign, verify, Signature, SIGNATURE_SIZE};
pub use kdf::{derive_key_from_password, generate_salt, PBKDF2_ITERATIONS, SALT_SIZE};
