use thiserror::Error;

/// Error types raised by a [`Crypto`](crate::Crypto) engine.
///
/// A signature that simply does not match is never one of these; engines
/// report that as `Ok(false)` from `verify`.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("invalid key length: expected {expected_len} bytes, found {found_len} bytes")]
    InvalidKeyLength { expected_len: usize, found_len: usize },

    #[error("private key is password protected but no password was supplied")]
    PasswordRequired,

    #[error("wrong password or corrupted private key container")]
    WrongPassword,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("private key encryption failed")]
    Encryption,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("verification could not be performed: {0}")]
    Verification(String),
}

/// Result type for capability operations
pub type Result<T> = std::result::Result<T, CryptoError>;
