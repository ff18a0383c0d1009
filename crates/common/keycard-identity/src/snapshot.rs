use crate::{CardScope, Fingerprint, IdentityError, IdentityType};
use keycard_crypto::Crypto;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// The logical fields of a card, before canonical encoding.
///
/// Canonical encoding is compact JSON with the fields in declaration order:
/// `identity`, `identity_type`, `public_key` (standard padded base64),
/// `scope`, then `data` with keys in byte order, omitted when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardSnapshot {
    pub identity: String,
    pub identity_type: IdentityType,
    #[serde(with = "crate::b64::bytes")]
    pub public_key: Vec<u8>,
    pub scope: CardScope,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl CardSnapshot {
    fn validate(&self) -> Result<(), IdentityError> {
        if self.identity.is_empty() {
            return Err(IdentityError::invalid_field("identity", "must not be empty"));
        }
        if self.identity_type.as_str().is_empty() {
            return Err(IdentityError::invalid_field("identity_type", "must not be empty"));
        }
        if self.public_key.is_empty() {
            return Err(IdentityError::invalid_field("public_key", "must not be empty"));
        }
        Ok(())
    }

    /// Encode into the canonical snapshot bytes.
    pub fn to_snapshot(&self) -> Result<Snapshot, IdentityError> {
        self.validate()?;
        Ok(Snapshot(serde_json::to_vec(self)?))
    }
}

/// Build the canonical snapshot for a card's logical fields.
///
/// Fails with [`IdentityError::InvalidField`] when `identity` or
/// `public_key` is empty.
pub fn build_snapshot(
    identity: &str,
    identity_type: IdentityType,
    public_key: &[u8],
    scope: CardScope,
    data: BTreeMap<String, String>,
) -> Result<Snapshot, IdentityError> {
    CardSnapshot {
        identity: identity.to_string(),
        identity_type,
        public_key: public_key.to_vec(),
        scope,
        data,
    }
    .to_snapshot()
}

/// Canonical, immutable byte representation of a card. Every signature on a
/// card is over the fingerprint of these bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Snapshot(Vec<u8>);

impl Snapshot {
    /// Wrap bytes received from elsewhere. Nothing is checked until the
    /// snapshot is parsed or validated.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn fingerprint(&self, crypto: &dyn Crypto) -> Fingerprint {
        Fingerprint::of(crypto, &self.0)
    }

    /// Decode the logical fields.
    pub fn parse(&self) -> Result<CardSnapshot, IdentityError> {
        let fields: CardSnapshot = serde_json::from_slice(&self.0)?;
        fields.validate()?;
        Ok(fields)
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(text) => write!(f, "Snapshot({})", text),
            Err(_) => write!(f, "Snapshot({} bytes)", self.0.len()),
        }
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        crate::b64::bytes::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::b64::bytes::deserialize(deserializer).map(Snapshot)
    }
}
