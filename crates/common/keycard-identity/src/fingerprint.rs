use crate::IdentityError;
use keycard_crypto::{Crypto, HashAlgorithm};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A digest of some byte content, used as that content's identity.
///
/// The digest is never empty; its text form is lowercase hex with no
/// separators.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    /// Fingerprint `data` with the card fingerprint algorithm (SHA-256).
    pub fn of(crypto: &dyn Crypto, data: &[u8]) -> Self {
        Self(crypto.hash(data, HashAlgorithm::Sha256))
    }

    /// Wrap an already computed digest.
    pub fn from_digest(digest: Vec<u8>) -> Result<Self, IdentityError> {
        if digest.is_empty() {
            return Err(IdentityError::InvalidFingerprint("empty digest".into()));
        }
        Ok(Self(digest))
    }

    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let digest = hex::decode(s).map_err(|e| IdentityError::InvalidFingerprint(e.to_string()))?;
        Self::from_digest(digest)
    }

    pub fn digest(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
