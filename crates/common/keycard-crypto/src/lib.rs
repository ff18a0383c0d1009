//! Keycard Crypto – the narrow capability interface every Keycard protocol
//! operation goes through.
//!
//! - [`Crypto`] is the only seam between the trust protocol and actual
//!   cryptography: hashing, signing, verification, key generation and key
//!   import/export.
//! - [`Ed25519Crypto`] is the default engine (Ed25519 signatures, SHA-2
//!   digests, DER key encodings, password-sealed private keys).
//! - Key material is opaque: [`PublicKey`] and [`PrivateKey`] carry a
//!   content-derived [`KeyId`] plus their encoded bytes.

#![forbid(unsafe_code)]

mod capability;
mod ed25519;
mod error;
mod keys;
mod sealed;

pub use capability::{Crypto, HashAlgorithm};
pub use ed25519::{Ed25519Crypto, ED25519_KEY_LENGTH, ED25519_SIGNATURE_LENGTH};
pub use error::{CryptoError, Result};
pub use keys::{KeyId, KeyPair, PrivateKey, PublicKey, KEY_ID_LENGTH};
