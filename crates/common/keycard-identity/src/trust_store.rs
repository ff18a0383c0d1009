use crate::IdentityError;
use keycard_crypto::{Crypto, PublicKey};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub(crate) fn check_verifier_id(verifier_id: &str) -> Result<(), IdentityError> {
    if verifier_id.is_empty() {
        return Err(IdentityError::invalid_field("verifier_id", "must not be empty"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct Verifier {
    public_key: PublicKey,
    mandatory: bool,
}

/// The validator's registry of trusted signers, keyed by verifier id.
///
/// Built once at startup and then read by many validations. Clones share the
/// same underlying map.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    verifiers: Arc<RwLock<HashMap<String, Verifier>>>,
}

impl TrustStore {
    /// Creates an empty store; only self-signatures are checked against it.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(
        &self,
        crypto: &dyn Crypto,
        verifier_id: &str,
        public_key: &[u8],
        mandatory: bool,
    ) -> Result<(), IdentityError> {
        check_verifier_id(verifier_id)?;
        let public_key = crypto.import_public_key(public_key)?;
        self.insert_all(vec![(verifier_id.to_string(), public_key, mandatory)])
    }

    /// Registers already imported keys under a single write lock, so readers
    /// see either none or all of them.
    pub(crate) fn insert_all(
        &self,
        entries: Vec<(String, PublicKey, bool)>,
    ) -> Result<(), IdentityError> {
        let mut verifiers = self
            .verifiers
            .write()
            .map_err(|_| IdentityError::TrustStoreAccess)?;
        for (verifier_id, public_key, mandatory) in entries {
            tracing::debug!(verifier = %verifier_id, mandatory, "Registered verifier");
            verifiers.insert(
                verifier_id,
                Verifier {
                    public_key,
                    mandatory,
                },
            );
        }
        Ok(())
    }

    /// Registers a verifier whose signature is checked when a card carries it.
    pub fn add_verifier(
        &self,
        crypto: &dyn Crypto,
        verifier_id: &str,
        public_key: &[u8],
    ) -> Result<(), IdentityError> {
        self.insert(crypto, verifier_id, public_key, false)
    }

    /// Registers a verifier whose signature every card must carry.
    pub fn add_mandatory_verifier(
        &self,
        crypto: &dyn Crypto,
        verifier_id: &str,
        public_key: &[u8],
    ) -> Result<(), IdentityError> {
        self.insert(crypto, verifier_id, public_key, true)
    }

    /// Removes a verifier, returning whether it was registered.
    pub fn remove_verifier(&self, verifier_id: &str) -> Result<bool, IdentityError> {
        let mut verifiers = self
            .verifiers
            .write()
            .map_err(|_| IdentityError::TrustStoreAccess)?;
        Ok(verifiers.remove(verifier_id).is_some())
    }

    pub fn get(&self, verifier_id: &str) -> Result<Option<PublicKey>, IdentityError> {
        let verifiers = self
            .verifiers
            .read()
            .map_err(|_| IdentityError::TrustStoreAccess)?;
        Ok(verifiers.get(verifier_id).map(|v| v.public_key.clone()))
    }

    pub fn is_mandatory(&self, verifier_id: &str) -> Result<bool, IdentityError> {
        let verifiers = self
            .verifiers
            .read()
            .map_err(|_| IdentityError::TrustStoreAccess)?;
        Ok(verifiers.get(verifier_id).map_or(false, |v| v.mandatory))
    }

    /// Registered verifier ids, sorted.
    pub fn verifier_ids(&self) -> Result<Vec<String>, IdentityError> {
        let verifiers = self
            .verifiers
            .read()
            .map_err(|_| IdentityError::TrustStoreAccess)?;
        let mut ids: Vec<String> = verifiers.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    pub fn len(&self) -> Result<usize, IdentityError> {
        let verifiers = self
            .verifiers
            .read()
            .map_err(|_| IdentityError::TrustStoreAccess)?;
        Ok(verifiers.len())
    }

    pub fn is_empty(&self) -> Result<bool, IdentityError> {
        Ok(self.len()? == 0)
    }

    /// Copy of every entry as `(id, key, mandatory)`, sorted by id, so a
    /// validation runs against one consistent view without holding the lock.
    pub(crate) fn entries(&self) -> Result<Vec<(String, PublicKey, bool)>, IdentityError> {
        let verifiers = self
            .verifiers
            .read()
            .map_err(|_| IdentityError::TrustStoreAccess)?;
        let mut entries: Vec<_> = verifiers
            .iter()
            .map(|(id, v)| (id.clone(), v.public_key.clone(), v.mandatory))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}
