use crate::{
    CardValidator, IdentityError, RequestSigner, TrustStore, ValidationTokenGenerator,
    VerifierPolicy,
};
use keycard_crypto::{Crypto, Ed25519Crypto};
use std::sync::Arc;

/// The engine and trust store shared by signers, validators and token
/// generators. Everything is passed in explicitly; there is no global
/// registry.
#[derive(Clone)]
pub struct Context {
    crypto: Arc<dyn Crypto>,
    trust_store: TrustStore,
}

impl Context {
    pub fn new(crypto: Arc<dyn Crypto>, trust_store: TrustStore) -> Self {
        Self {
            crypto,
            trust_store,
        }
    }

    /// Ed25519 engine with an empty trust store.
    pub fn ed25519() -> Self {
        Self::new(Arc::new(Ed25519Crypto::new()), TrustStore::new())
    }

    pub fn crypto(&self) -> &dyn Crypto {
        self.crypto.as_ref()
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    /// Register a verifier in the shared trust store.
    pub fn add_verifier(&self, verifier_id: &str, public_key: &[u8]) -> Result<(), IdentityError> {
        self.trust_store
            .add_verifier(self.crypto.as_ref(), verifier_id, public_key)
    }

    /// Register a verifier every card must be signed by.
    pub fn add_mandatory_verifier(
        &self,
        verifier_id: &str,
        public_key: &[u8],
    ) -> Result<(), IdentityError> {
        self.trust_store
            .add_mandatory_verifier(self.crypto.as_ref(), verifier_id, public_key)
    }

    pub fn request_signer(&self) -> RequestSigner {
        RequestSigner::new(self.crypto.clone())
    }

    pub fn card_validator(&self, policy: VerifierPolicy) -> CardValidator {
        CardValidator::new(self.crypto.clone(), self.trust_store.clone(), policy)
    }

    pub fn token_generator(&self) -> ValidationTokenGenerator {
        ValidationTokenGenerator::new(self.crypto.clone())
    }
}
