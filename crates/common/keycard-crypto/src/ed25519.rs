use crate::sealed;
use crate::{Crypto, CryptoError, HashAlgorithm, KeyId, KeyPair, PrivateKey, PublicKey, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Raw Ed25519 key length (public key or seed).
pub const ED25519_KEY_LENGTH: usize = 32;

/// Ed25519 signature length.
pub const ED25519_SIGNATURE_LENGTH: usize = 64;

// RFC 8410 SubjectPublicKeyInfo header for id-Ed25519.
const SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

// RFC 8410 OneAsymmetricKey (PKCS#8 v1) header for id-Ed25519.
const PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

/// Ed25519 engine backed by `ed25519-dalek`.
///
/// Public keys travel as DER SubjectPublicKeyInfo, private keys as PKCS#8 DER
/// (optionally sealed under a password).
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Crypto;

impl Ed25519Crypto {
    pub fn new() -> Self {
        Self
    }

    fn encode_public(key: &VerifyingKey) -> Vec<u8> {
        let mut der = Vec::with_capacity(SPKI_PREFIX.len() + ED25519_KEY_LENGTH);
        der.extend_from_slice(&SPKI_PREFIX);
        der.extend_from_slice(key.as_bytes());
        der
    }

    fn encode_private(key: &SigningKey) -> Zeroizing<Vec<u8>> {
        let seed = Zeroizing::new(key.to_bytes());
        let mut der = Zeroizing::new(Vec::with_capacity(PKCS8_PREFIX.len() + ED25519_KEY_LENGTH));
        der.extend_from_slice(&PKCS8_PREFIX);
        der.extend_from_slice(seed.as_slice());
        der
    }

    fn strip_header<'a>(der: &'a [u8], header: &[u8]) -> Result<&'a [u8; ED25519_KEY_LENGTH]> {
        let body = der.strip_prefix(header).ok_or_else(|| {
            CryptoError::InvalidKeyEncoding("not an Ed25519 DER structure".to_string())
        })?;
        body.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected_len: ED25519_KEY_LENGTH,
            found_len: body.len(),
        })
    }

    fn verifying_key(key: &PublicKey) -> Result<VerifyingKey> {
        let raw = Self::strip_header(key.encoded(), &SPKI_PREFIX)?;
        VerifyingKey::from_bytes(raw).map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))
    }

    fn signing_key_from_der(der: &[u8]) -> Result<SigningKey> {
        let seed = Self::strip_header(der, &PKCS8_PREFIX)?;
        Ok(SigningKey::from_bytes(seed))
    }

    fn signing_key(key: &PrivateKey) -> Result<SigningKey> {
        Self::signing_key_from_der(key.encoded())
    }

    fn wrap_signing_key(signing_key: &SigningKey) -> PrivateKey {
        let public = Self::encode_public(&signing_key.verifying_key());
        PrivateKey::new(KeyId::derive(&public), Self::encode_private(signing_key))
    }
}

impl Crypto for Ed25519Crypto {
    fn hash(&self, data: &[u8], algorithm: HashAlgorithm) -> Vec<u8> {
        algorithm.digest(data)
    }

    fn sign(&self, data: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>> {
        let signing_key = Self::signing_key(private_key)
            .map_err(|e| CryptoError::Signing(format!("key {}: {}", private_key.id(), e)))?;
        Ok(signing_key.sign(data).to_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8], public_key: &PublicKey) -> Result<bool> {
        let verifying_key = Self::verifying_key(public_key)
            .map_err(|e| CryptoError::Verification(format!("key {}: {}", public_key.id(), e)))?;

        // A signature of the wrong size is a mismatch, not a fault.
        let Ok(bytes) = <[u8; ED25519_SIGNATURE_LENGTH]>::try_from(signature) else {
            return Ok(false);
        };
        let signature = Signature::from_bytes(&bytes);
        Ok(verifying_key.verify(data, &signature).is_ok())
    }

    fn generate_key_pair(&self) -> Result<KeyPair> {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public = PublicKey::new(Self::encode_public(&signing_key.verifying_key()));
        let private = Self::wrap_signing_key(&signing_key);
        Ok(KeyPair { public, private })
    }

    fn import_private_key(&self, data: &[u8], password: Option<&str>) -> Result<PrivateKey> {
        if sealed::is_sealed(data) {
            let password = password.ok_or(CryptoError::PasswordRequired)?;
            let der = sealed::open(data, password)?;
            Ok(Self::wrap_signing_key(&Self::signing_key_from_der(&der)?))
        } else {
            // An unsealed key imports the same way whether or not a password was passed.
            Ok(Self::wrap_signing_key(&Self::signing_key_from_der(data)?))
        }
    }

    fn export_private_key(
        &self,
        private_key: &PrivateKey,
        password: Option<&str>,
    ) -> Result<Vec<u8>> {
        // Re-validate so a foreign encoding is never written out.
        Self::signing_key(private_key)?;
        match password {
            Some(password) => sealed::seal(private_key.encoded(), password),
            None => Ok(private_key.encoded().to_vec()),
        }
    }

    fn import_public_key(&self, data: &[u8]) -> Result<PublicKey> {
        let key = PublicKey::new(data.to_vec());
        Self::verifying_key(&key)?;
        Ok(key)
    }

    fn export_public_key(&self, public_key: &PublicKey) -> Vec<u8> {
        public_key.encoded().to_vec()
    }

    fn extract_public_key(&self, private_key: &PrivateKey) -> Result<PublicKey> {
        let signing_key = Self::signing_key(private_key)?;
        Ok(PublicKey::new(Self::encode_public(&signing_key.verifying_key())))
    }
}
