use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keycard_crypto::{Crypto, KeyPair, PrivateKey, PublicKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk key pair: base64 exported keys, the private half optionally sealed.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyFile {
    pub key_id: String,
    pub public_key: String,
    pub private_key: String,
    #[serde(default)]
    pub sealed: bool,
}

impl KeyFile {
    pub fn new(crypto: &dyn Crypto, key_pair: &KeyPair, password: Option<&str>) -> Result<Self> {
        let private = crypto
            .export_private_key(&key_pair.private, password)
            .map_err(|e| anyhow!("Failed to export private key: {}", e))?;
        Ok(Self {
            key_id: key_pair.public.id().to_hex(),
            public_key: STANDARD.encode(crypto.export_public_key(&key_pair.public)),
            private_key: STANDARD.encode(private),
            sealed: password.is_some(),
        })
    }

    pub fn public_key(&self, crypto: &dyn Crypto) -> Result<PublicKey> {
        crypto
            .import_public_key(&self.public_key_der()?)
            .map_err(|e| anyhow!("Key file public key is unusable: {}", e))
    }

    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.public_key)
            .map_err(|e| anyhow!("Key file public key is not valid base64: {}", e))
    }

    pub fn private_key(&self, crypto: &dyn Crypto, password: Option<&str>) -> Result<PrivateKey> {
        if self.sealed && password.is_none() {
            return Err(anyhow!(
                "Key {} is password protected; pass --password",
                self.key_id
            ));
        }
        let bytes = STANDARD
            .decode(&self.private_key)
            .map_err(|e| anyhow!("Key file private key is not valid base64: {}", e))?;
        crypto
            .import_private_key(&bytes, password)
            .map_err(|e| anyhow!("Failed to import private key {}: {}", self.key_id, e))
    }
}

/// Reads a file and parses its content as JSON into a specified type `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read {} file '{}': {}", what, path.display(), e))?;
    serde_json::from_str(&text)
        .map_err(|e| anyhow!("Failed to parse {} from '{}': {}", what, path.display(), e))
}

/// Serializes `value` as pretty JSON into `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| anyhow!("Failed to serialize {}: {}", what, e))?;
    std::fs::write(path, text)
        .map_err(|e| anyhow!("Failed to write {} to file '{}': {}", what, path.display(), e))
}
