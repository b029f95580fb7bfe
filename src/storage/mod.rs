//! # Storage Module
//!
//! Local storage for key material.
//!
//! The only durable state the crypto engine owns is key material: identity
//! private/public keys and per-session ephemeral private keys. Everything
//! lives in the [`SecureStore`], a tamper-resistant key-value store keyed by
//! stable logical names (see [`names`]). Message history and user data are
//! the application's concern, not the engine's.

mod secure_store;

pub use secure_store::{names, SecureStore};
