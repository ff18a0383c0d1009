//! Password-sealed private key container.
//!
//! Layout: `MAGIC || salt(16) || nonce(24) || XChaCha20-Poly1305(der)`.
//! The AEAD key is `Argon2id(password, salt)` with fixed cost parameters;
//! the magic prefix is bound as associated data.

use crate::{CryptoError, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

const MAGIC: &[u8; 5] = b"KCSK2";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

// Argon2id cost: 19 MiB, 2 passes, 1 lane.
const ARGON2_MEMORY_KIB: u32 = 19 * 1024;
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_LANES: u32 = 1;

pub(crate) fn is_sealed(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}

fn cipher_for(password: &str, salt: &[u8]) -> Result<XChaCha20Poly1305> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_LANES,
        Some(KEY_LEN),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password.as_bytes(), salt, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(XChaCha20Poly1305::new(Key::from_slice(&key[..])))
}

pub(crate) fn seal(der: &[u8], password: &str) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher_for(password, &salt)?
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: der,
                aad: MAGIC,
            },
        )
        .map_err(|_| CryptoError::Encryption)?;

    let mut out = Vec::with_capacity(MAGIC.len() + SALT_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub(crate) fn open(sealed: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>> {
    let body = sealed
        .strip_prefix(MAGIC.as_slice())
        .filter(|body| body.len() >= SALT_LEN + NONCE_LEN + TAG_LEN)
        .ok_or_else(|| CryptoError::InvalidKeyEncoding("truncated sealed private key".into()))?;

    let (salt, rest) = body.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    cipher_for(password, salt)?
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: MAGIC,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::WrongPassword)
}
