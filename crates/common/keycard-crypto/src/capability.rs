use crate::{KeyPair, PrivateKey, PublicKey, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Digest algorithms an engine must support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    /// SHA-256, used for card fingerprints.
    #[default]
    #[serde(rename = "sha-256")]
    Sha256,
    #[serde(rename = "sha-384")]
    Sha384,
    #[serde(rename = "sha-512")]
    Sha512,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub const fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Software SHA-2 digest; engines without hardware hashing delegate here.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// The cryptographic capabilities the Keycard protocol consumes.
///
/// The protocol never performs signature math itself. It only relies on:
/// - `sign` followed by `verify` with the matching key returning `true`;
/// - `verify` returning `Ok(false)`, never an error, for a signature that is
///   wrong or malformed. `Err` is reserved for unusable key material.
pub trait Crypto: Send + Sync {
    /// Hash `data` with `algorithm`.
    fn hash(&self, data: &[u8], algorithm: HashAlgorithm) -> Vec<u8>;

    /// Sign `data` with `private_key`.
    fn sign(&self, data: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>>;

    /// Check `signature` over `data` against `public_key`.
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &PublicKey) -> Result<bool>;

    /// Generate a fresh key pair.
    fn generate_key_pair(&self) -> Result<KeyPair>;

    /// Import a private key, unsealing it with `password` when it was exported
    /// with one.
    fn import_private_key(&self, data: &[u8], password: Option<&str>) -> Result<PrivateKey>;

    /// Export a private key, sealing it under `password` when one is given.
    fn export_private_key(&self, private_key: &PrivateKey, password: Option<&str>)
        -> Result<Vec<u8>>;

    /// Import and validate an encoded public key.
    fn import_public_key(&self, data: &[u8]) -> Result<PublicKey>;

    /// Export a public key in the encoding `import_public_key` accepts.
    fn export_public_key(&self, public_key: &PublicKey) -> Vec<u8>;

    /// Derive the public half of `private_key`.
    fn extract_public_key(&self, private_key: &PrivateKey) -> Result<PublicKey>;
}
