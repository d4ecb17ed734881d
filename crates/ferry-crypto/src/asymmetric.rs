// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker RSA keypair used to wrap one-time symmetric keys.
//!
//! Only short keys are ever encrypted with RSA (OAEP, SHA-256); bulk payloads
//! always go through [`crate::symmetric`].

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ferry_core::FerryError;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::symmetric::SymmetricKey;

/// A freshly generated keypair. The private half never leaves process memory.
pub struct WorkerKeyPair {
    private: RsaPrivateKey,
    public: PublicKey,
}

impl WorkerKeyPair {
    /// Generate a keypair with a `bits`-bit modulus.
    ///
    /// CPU-bound; async callers should run it on a blocking thread.
    pub fn generate(bits: usize) -> Result<Self, FerryError> {
        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| FerryError::Credential(format!("RSA key generation failed: {e}")))?;
        let public = PublicKey(RsaPublicKey::from(&private));
        Ok(Self { private, public })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Recover a symmetric key wrapped with this keypair's public half.
    pub fn unwrap_key(&self, wrapped: &str) -> Result<SymmetricKey, FerryError> {
        let ciphertext = URL_SAFE_NO_PAD
            .decode(wrapped)
            .map_err(|_| FerryError::Credential("wrapped key is not valid base64url".into()))?;
        let key_bytes = Zeroizing::new(
            self.private
                .decrypt(Oaep::new::<Sha256>(), &ciphertext)
                .map_err(|_| FerryError::Credential("failed to unwrap key -- wrong keypair".into()))?,
        );
        SymmetricKey::from_bytes(&key_bytes)
    }
}

impl fmt::Debug for WorkerKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerKeyPair")
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// The publishable half of a [`WorkerKeyPair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Base64url of the SubjectPublicKeyInfo DER, as stored in the job record.
    pub fn encode(&self) -> Result<String, FerryError> {
        let der = self
            .0
            .to_public_key_der()
            .map_err(|e| FerryError::Credential(format!("failed to encode public key: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(der.as_bytes()))
    }

    pub fn decode(encoded: &str) -> Result<Self, FerryError> {
        let der = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| FerryError::Credential("public key is not valid base64url".into()))?;
        RsaPublicKey::from_public_key_der(&der)
            .map(PublicKey)
            .map_err(|e| FerryError::Credential(format!("malformed public key: {e}")))
    }

    /// Encrypt `key` so only the matching private key can recover it.
    pub fn wrap_key(&self, key: &SymmetricKey) -> Result<String, FerryError> {
        let ciphertext = self
            .0
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_bytes())
            .map_err(|e| FerryError::Credential(format!("failed to wrap key: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(ciphertext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Small modulus keeps debug-build tests fast; still large enough for OAEP-SHA256.
    const TEST_BITS: usize = 1024;

    #[test]
    fn wrap_unwrap_roundtrip() {
        let pair = WorkerKeyPair::generate(TEST_BITS).unwrap();
        let key = SymmetricKey::generate().unwrap();
        let wrapped = pair.public_key().wrap_key(&key).unwrap();
        let unwrapped = pair.unwrap_key(&wrapped).unwrap();
        assert_eq!(unwrapped.as_bytes(), key.as_bytes());
    }

    #[test]
    fn public_key_survives_encoding() {
        let pair = WorkerKeyPair::generate(TEST_BITS).unwrap();
        let encoded = pair.public_key().encode().unwrap();
        let decoded = PublicKey::decode(&encoded).unwrap();
        assert_eq!(&decoded, pair.public_key());

        let key = SymmetricKey::generate().unwrap();
        let wrapped = decoded.wrap_key(&key).unwrap();
        assert_eq!(pair.unwrap_key(&wrapped).unwrap().as_bytes(), key.as_bytes());
    }

    #[test]
    fn other_keypair_cannot_unwrap() {
        let ours = WorkerKeyPair::generate(TEST_BITS).unwrap();
        let theirs = WorkerKeyPair::generate(TEST_BITS).unwrap();
        let wrapped = ours
            .public_key()
            .wrap_key(&SymmetricKey::generate().unwrap())
            .unwrap();
        assert!(matches!(theirs.unwrap_key(&wrapped), Err(FerryError::Credential(_))));
    }

    #[test]
    fn garbage_public_key_is_rejected() {
        assert!(PublicKey::decode("bm90IGEga2V5").is_err());
        assert!(PublicKey::decode("***").is_err());
    }

    #[test]
    fn debug_hides_private_key() {
        let pair = WorkerKeyPair::generate(TEST_BITS).unwrap();
        assert!(format!("{pair:?}").contains("REDACTED"));
    }
}
