use crate::{CardRequest, Fingerprint, IdentityError};
use keycard_crypto::{Crypto, PrivateKey};
use std::sync::Arc;

/// Produces the named signatures a card carries.
///
/// Both roles sign the same quantity, the digest of the snapshot fingerprint,
/// so one request can hold independently verifiable signatures from unrelated
/// parties without being re-encoded.
#[derive(Clone)]
pub struct RequestSigner {
    crypto: Arc<dyn Crypto>,
}

impl RequestSigner {
    pub fn new(crypto: Arc<dyn Crypto>) -> Self {
        Self { crypto }
    }

    fn sign_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        private_key: &PrivateKey,
    ) -> Result<Vec<u8>, IdentityError> {
        self.crypto
            .sign(fingerprint.digest(), private_key)
            .map_err(IdentityError::Signing)
    }

    /// Sign as the card owner. The signer id is the hex fingerprint of the
    /// snapshot itself.
    ///
    /// `owner_key` must be the private half of the public key inside the
    /// snapshot. Returns the signer id used.
    pub fn self_sign(
        &self,
        request: &mut CardRequest,
        owner_key: &PrivateKey,
    ) -> Result<String, IdentityError> {
        let fields = request.snapshot().parse()?;
        let card_key = self.crypto.import_public_key(&fields.public_key)?;
        if card_key.id() != owner_key.id() {
            return Err(IdentityError::KeyMismatch {
                private_key: owner_key.id(),
                card_key: card_key.id(),
            });
        }

        let fingerprint = request.snapshot().fingerprint(self.crypto.as_ref());
        let signature = self.sign_fingerprint(&fingerprint, owner_key)?;
        let signer_id = fingerprint.to_hex();
        request.attach_signature(&fingerprint, signer_id.clone(), signature)?;
        tracing::debug!(signer = %signer_id, "Self-signed card request");
        Ok(signer_id)
    }

    /// Sign as a named authority (an application, a revocation service, ...),
    /// storing the signature under `authority_id`.
    ///
    /// The id must not be the snapshot fingerprint, which names the
    /// self-signature.
    pub fn authority_sign(
        &self,
        request: &mut CardRequest,
        authority_id: &str,
        authority_key: &PrivateKey,
    ) -> Result<(), IdentityError> {
        if authority_id.is_empty() {
            return Err(IdentityError::invalid_field("authority_id", "must not be empty"));
        }
        let fingerprint = request.snapshot().fingerprint(self.crypto.as_ref());
        if authority_id.eq_ignore_ascii_case(&fingerprint.to_hex()) {
            return Err(IdentityError::invalid_field(
                "authority_id",
                "is reserved for the self-signature",
            ));
        }
        let signature = self.sign_fingerprint(&fingerprint, authority_key)?;
        request.attach_signature(&fingerprint, authority_id.to_string(), signature)?;
        tracing::debug!(
            signer = %authority_id,
            card = %fingerprint,
            "Authority-signed card request"
        );
        Ok(())
    }
}
