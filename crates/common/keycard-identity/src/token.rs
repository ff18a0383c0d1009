//! Stateless identity validation tokens.
//!
//! An authority that has checked an identity out of band signs
//! `nonce ++ identity_type ++ identity_value` (UTF-8, no separators) and
//! hands out `base64(nonce ++ "." ++ base64(signature))`. Anyone holding the
//! authority's public key can later check the token against the identity it
//! is presented with. The identity itself is not inside the token.

use crate::IdentityError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keycard_crypto::{Crypto, PrivateKey, PublicKey};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;

const NONCE_LEN: usize = 16;

/// A decoded validation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationToken {
    pub nonce: String,
    pub signature: Vec<u8>,
}

impl ValidationToken {
    /// Decode a token string. `None` when it is not a well-formed token.
    pub fn parse(token: &str) -> Option<Self> {
        let decoded = STANDARD.decode(token.trim()).ok()?;
        let text = String::from_utf8(decoded).ok()?;
        let (nonce, signature) = text.split_once('.')?;
        if nonce.is_empty() {
            return None;
        }
        let signature = STANDARD.decode(signature).ok()?;
        Some(Self {
            nonce: nonce.to_string(),
            signature,
        })
    }

    /// Encode to the transmitted string form.
    pub fn encode(&self) -> String {
        let inner = format!("{}.{}", self.nonce, STANDARD.encode(&self.signature));
        STANDARD.encode(inner)
    }
}

fn signed_message(nonce: &str, identity_type: &str, identity_value: &str) -> Vec<u8> {
    let mut message =
        Vec::with_capacity(nonce.len() + identity_type.len() + identity_value.len());
    message.extend_from_slice(nonce.as_bytes());
    message.extend_from_slice(identity_type.as_bytes());
    message.extend_from_slice(identity_value.as_bytes());
    message
}

/// Issues validation tokens and checks them.
#[derive(Clone)]
pub struct ValidationTokenGenerator {
    crypto: Arc<dyn Crypto>,
}

impl ValidationTokenGenerator {
    pub fn new(crypto: Arc<dyn Crypto>) -> Self {
        Self { crypto }
    }

    /// Issue a token asserting that `(identity_type, identity_value)` was
    /// checked by the holder of `authority_key`.
    pub fn generate(
        &self,
        identity_type: &str,
        identity_value: &str,
        authority_key: &PrivateKey,
    ) -> Result<String, IdentityError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let nonce = hex::encode(nonce);

        let signature = self
            .crypto
            .sign(
                &signed_message(&nonce, identity_type, identity_value),
                authority_key,
            )
            .map_err(IdentityError::Signing)?;
        tracing::debug!(identity_type, authority = %authority_key.id(), "Issued validation token");
        Ok(ValidationToken { nonce, signature }.encode())
    }

    /// Like [`generate`](Self::generate), importing the authority key from its
    /// exported (optionally password-sealed) form first.
    pub fn generate_with_exported_key(
        &self,
        identity_type: &str,
        identity_value: &str,
        exported_key: &[u8],
        password: Option<&str>,
    ) -> Result<String, IdentityError> {
        let authority_key = self
            .crypto
            .import_private_key(exported_key, password)
            .map_err(IdentityError::Signing)?;
        self.generate(identity_type, identity_value, &authority_key)
    }

    /// Check `token` against the identity it is presented for.
    ///
    /// A malformed or mismatching token is `Ok(false)`; `Err` only when the
    /// authority key itself is unusable.
    pub fn verify(
        &self,
        token: &str,
        identity_type: &str,
        identity_value: &str,
        authority_key: &PublicKey,
    ) -> Result<bool, IdentityError> {
        let Some(token) = ValidationToken::parse(token) else {
            tracing::debug!("Rejected malformed validation token");
            return Ok(false);
        };
        self.crypto
            .verify(
                &signed_message(&token.nonce, identity_type, identity_value),
                &token.signature,
                authority_key,
            )
            .map_err(IdentityError::Verification)
    }
}
