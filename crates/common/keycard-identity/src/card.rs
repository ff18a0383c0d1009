use crate::{Fingerprint, IdentityError, ProtocolVersion, Snapshot};
use keycard_crypto::{Crypto, PublicKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A card under construction: a fixed snapshot collecting signatures.
///
/// Signatures are keyed by signer id; adding a second signature under the
/// same id replaces the first. Once every wanted signature is attached,
/// [`CardRequest::build`] freezes it into an immutable [`Card`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRequest {
    snapshot: Snapshot,
    #[serde(with = "crate::b64::signature_map")]
    signatures: BTreeMap<String, Vec<u8>>,
    version: ProtocolVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signed_fingerprint: Option<Fingerprint>,
}

impl CardRequest {
    /// Start a request for the current protocol version.
    pub fn new(snapshot: Snapshot) -> Self {
        Self::with_version(snapshot, ProtocolVersion::current())
    }

    pub fn with_version(snapshot: Snapshot, version: ProtocolVersion) -> Self {
        Self {
            snapshot,
            signatures: BTreeMap::new(),
            version,
            signed_fingerprint: None,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn version(&self) -> &ProtocolVersion {
        &self.version
    }

    pub fn signatures(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.signatures
    }

    /// Attach `signature` under `signer_id`, made over `fingerprint`.
    ///
    /// Every signature on one request must be over the same fingerprint;
    /// a different one means the snapshot changed after signing began.
    pub(crate) fn attach_signature(
        &mut self,
        fingerprint: &Fingerprint,
        signer_id: String,
        signature: Vec<u8>,
    ) -> Result<(), IdentityError> {
        match &self.signed_fingerprint {
            Some(signed) if signed != fingerprint => {
                return Err(IdentityError::SnapshotMutated {
                    signed: signed.to_hex(),
                    current: fingerprint.to_hex(),
                });
            }
            Some(_) => {}
            None => self.signed_fingerprint = Some(fingerprint.clone()),
        }
        self.signatures.insert(signer_id, signature);
        Ok(())
    }

    /// Freeze the request. The card id is the snapshot fingerprint.
    ///
    /// A signed request must still carry the fingerprint its signatures were
    /// made over, and that fingerprint must match the snapshot.
    pub fn build(self, crypto: &dyn Crypto) -> Result<Card, IdentityError> {
        let id = self.snapshot.fingerprint(crypto);
        match &self.signed_fingerprint {
            Some(signed) if *signed != id => {
                return Err(IdentityError::SnapshotMutated {
                    signed: signed.to_hex(),
                    current: id.to_hex(),
                });
            }
            None if !self.signatures.is_empty() => {
                return Err(IdentityError::invalid_field(
                    "signed_fingerprint",
                    "missing on a signed request",
                ));
            }
            _ => {}
        }
        Ok(Card {
            id,
            snapshot: self.snapshot,
            signatures: self.signatures,
            version: self.version,
        })
    }
}

/// An immutable, signed card as transmitted between parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    id: Fingerprint,
    snapshot: Snapshot,
    #[serde(with = "crate::b64::signature_map")]
    signatures: BTreeMap<String, Vec<u8>>,
    version: ProtocolVersion,
}

impl Card {
    /// Reassemble a received card. The id is taken as given; whether it
    /// matches the snapshot is decided by validation.
    pub fn from_parts(
        id: Fingerprint,
        snapshot: Snapshot,
        signatures: BTreeMap<String, Vec<u8>>,
        version: ProtocolVersion,
    ) -> Self {
        Self {
            id,
            snapshot,
            signatures,
            version,
        }
    }

    pub fn id(&self) -> &Fingerprint {
        &self.id
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn signatures(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.signatures
    }

    pub fn signature(&self, signer_id: &str) -> Option<&[u8]> {
        self.signatures.get(signer_id).map(Vec::as_slice)
    }

    pub fn version(&self) -> &ProtocolVersion {
        &self.version
    }

    /// Import the public key embedded in the snapshot. Only meaningful once the
    /// card has validated.
    pub fn public_key(&self, crypto: &dyn Crypto) -> Result<PublicKey, IdentityError> {
        let fields = self.snapshot.parse()?;
        Ok(crypto.import_public_key(&fields.public_key)?)
    }

    /// Break the card back into its parts.
    pub fn into_parts(
        self,
    ) -> (
        Fingerprint,
        Snapshot,
        BTreeMap<String, Vec<u8>>,
        ProtocolVersion,
    ) {
        (self.id, self.snapshot, self.signatures, self.version)
    }
}
