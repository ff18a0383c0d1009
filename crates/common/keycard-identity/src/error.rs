use keycard_crypto::{CryptoError, KeyId};
use thiserror::Error;

/// Structural and capability errors.
///
/// Trust outcomes ("this card is not valid", "this token does not match") are
/// never reported through this type; see [`Verdict`](crate::Verdict).
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("signing failed: {0}")]
    Signing(#[source] CryptoError),

    #[error("verification could not be performed: {0}")]
    Verification(#[source] CryptoError),

    #[error("key error: {0}")]
    Key(#[from] CryptoError),

    #[error("private key {private_key} does not match the card's public key {card_key}")]
    KeyMismatch { private_key: KeyId, card_key: KeyId },

    #[error("snapshot changed after signing began: signed {signed}, now {current}")]
    SnapshotMutated { signed: String, current: String },

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(#[from] serde_json::Error),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("trust store configuration error: {0}")]
    Config(String),

    #[error("trust store access error")]
    TrustStoreAccess,
}

impl IdentityError {
    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        IdentityError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
