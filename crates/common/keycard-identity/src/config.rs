use crate::trust_store::check_verifier_id;
use crate::{IdentityError, TrustStore};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keycard_crypto::Crypto;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One trusted signer in a bootstrap file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierEntry {
    /// Signer id as it appears on cards (e.g. an application id).
    pub id: String,
    /// Standard base64 of the exported public key.
    pub public_key: String,
    /// Whether every card must carry this signer's signature.
    #[serde(default)]
    pub mandatory: bool,
}

/// Trust store bootstrap configuration, loaded from TOML:
///
/// ```toml
/// [[verifier]]
/// id = "app-1"
/// public_key = "MCowBQYDK2VwAyEA..."
/// mandatory = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustStoreConfig {
    #[serde(default, rename = "verifier")]
    pub verifiers: Vec<VerifierEntry>,
}

impl TrustStoreConfig {
    /// Load trust store configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, IdentityError> {
        let path_ref = path.as_ref();
        tracing::info!("Loading trust store config from: {:?}", path_ref);
        let text = fs::read_to_string(path_ref).map_err(|e| {
            IdentityError::Config(format!("failed to read {:?}: {}", path_ref, e))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(
            verifiers = config.verifiers.len(),
            "Loaded trust store config from: {:?}",
            path_ref
        );
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, IdentityError> {
        toml::from_str(text).map_err(|e| IdentityError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, IdentityError> {
        toml::to_string(self).map_err(|e| IdentityError::Config(e.to_string()))
    }

    /// Register every configured verifier in `store`.
    ///
    /// Every entry is decoded and imported before the store is touched; if
    /// any entry is unusable the store is left unchanged.
    pub fn apply(&self, store: &TrustStore, crypto: &dyn Crypto) -> Result<(), IdentityError> {
        let mut staged = Vec::with_capacity(self.verifiers.len());
        for entry in &self.verifiers {
            check_verifier_id(&entry.id)?;
            let encoded = STANDARD.decode(entry.public_key.trim()).map_err(|e| {
                IdentityError::Config(format!("verifier `{}`: bad public key: {}", entry.id, e))
            })?;
            let public_key = crypto.import_public_key(&encoded)?;
            staged.push((entry.id.clone(), public_key, entry.mandatory));
        }
        store.insert_all(staged)
    }
}
