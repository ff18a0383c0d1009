use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// Length of a [`KeyId`] in bytes.
pub const KEY_ID_LENGTH: usize = 8;

/// Content-derived key identifier: the first 8 bytes of
/// `SHA-256(encoded public key)`.
///
/// Both halves of a key pair carry the same id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId([u8; KEY_ID_LENGTH]);

impl KeyId {
    /// Derive the id from an encoded public key.
    pub fn derive(encoded_public_key: &[u8]) -> Self {
        let digest = Sha256::digest(encoded_public_key);
        let mut id = [0u8; KEY_ID_LENGTH];
        id.copy_from_slice(&digest[..KEY_ID_LENGTH]);
        Self(id)
    }

    pub const fn from_bytes(bytes: [u8; KEY_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; KEY_ID_LENGTH] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self.to_hex())
    }
}

/// An encoded public key together with its [`KeyId`].
///
/// The encoding is whatever the producing engine exports (DER
/// SubjectPublicKeyInfo for [`Ed25519Crypto`](crate::Ed25519Crypto)).
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    id: KeyId,
    encoded: Vec<u8>,
}

impl PublicKey {
    /// Wrap already-validated encoded key bytes. Engines call this after
    /// checking the encoding; the id is derived from the bytes.
    pub fn new(encoded: Vec<u8>) -> Self {
        let id = KeyId::derive(&encoded);
        Self { id, encoded }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey").field("id", &self.id).finish()
    }
}

/// An encoded private key. The bytes are wiped when the value is dropped.
#[derive(Clone)]
pub struct PrivateKey {
    id: KeyId,
    encoded: Zeroizing<Vec<u8>>,
}

impl PrivateKey {
    /// `id` must be the id of the matching public key.
    pub fn new(id: KeyId, encoded: Zeroizing<Vec<u8>>) -> Self {
        Self { id, encoded }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("id", &self.id)
            .field("encoded", &"<redacted>")
            .finish()
    }
}

/// A freshly generated or imported key pair.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}
