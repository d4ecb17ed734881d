// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM session and one-time keys.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG and prepends it to the output. Nonce reuse would be catastrophic for
//! GCM security.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ferry_core::FerryError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// A 256-bit AES key, wiped from memory on drop.
#[derive(Clone)]
pub struct SymmetricKey(Zeroizing<[u8; KEY_LEN]>);

impl SymmetricKey {
    /// Generate a random key from the system CSPRNG.
    pub fn generate() -> Result<Self, FerryError> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        SystemRandom::new()
            .fill(&mut key[..])
            .map_err(|_| FerryError::Credential("failed to generate random key".to_string()))?;
        Ok(Self(key))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FerryError> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            FerryError::Credential(format!(
                "symmetric key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(Zeroizing::new(array)))
    }

    /// Base64url encoding, as stored in the job record.
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0[..])
    }

    pub fn decode(encoded: &str) -> Result<Self, FerryError> {
        let bytes = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(encoded)
                .map_err(|_| FerryError::Credential("symmetric key is not valid base64url".into()))?,
        );
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

fn aead_key(key: &SymmetricKey) -> Result<LessSafeKey, FerryError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())
        .map_err(|_| FerryError::Credential("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, FerryError> {
    let sealing = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| FerryError::Credential("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    sealing
        .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce_bytes), Aad::empty(), &mut in_out)
        .map_err(|_| FerryError::Credential("AES-256-GCM encryption failed".to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&in_out);
    Ok(out)
}

/// Decrypt the output of [`seal`].
///
/// Fails closed: a buffer too short to hold nonce and tag, a wrong key, or any
/// tampering is an error, never partial plaintext.
pub fn open(key: &SymmetricKey, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, FerryError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(FerryError::Credential(format!(
            "ciphertext too short: {} bytes",
            sealed.len()
        )));
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| FerryError::Credential("malformed nonce".to_string()))?;

    let opening = aead_key(key)?;
    let mut in_out = Zeroizing::new(ciphertext.to_vec());
    let plaintext_len = opening
        .open_in_place(nonce, Aad::empty(), in_out.as_mut_slice())
        .map_err(|_| {
            FerryError::Credential("AES-256-GCM decryption failed -- wrong key or corrupted data".to_string())
        })?
        .len();
    in_out.truncate(plaintext_len);
    Ok(in_out)
}

/// [`seal`] then base64url-encode.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<String, FerryError> {
    Ok(URL_SAFE_NO_PAD.encode(seal(key, plaintext)?))
}

/// Decode base64url then [`open`].
pub fn decrypt(key: &SymmetricKey, encoded: &str) -> Result<Zeroizing<Vec<u8>>, FerryError> {
    let sealed = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| FerryError::Credential("ciphertext is not valid base64url".to_string()))?;
    open(key, &sealed)
}
