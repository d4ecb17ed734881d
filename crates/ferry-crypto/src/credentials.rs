// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! First- and second-layer encryption of [`AuthData`].

use ferry_core::{AuthData, FerryError, JobAuthorization};
use tracing::debug;
use zeroize::Zeroizing;

use crate::asymmetric::{PublicKey, WorkerKeyPair};
use crate::symmetric::{self, SymmetricKey};

/// Label written into the job record alongside second-layer ciphertexts.
pub const ENCRYPTION_SCHEME: &str = "rsa-oaep-sha256+aes-256-gcm";

fn encrypt_auth_data(key: &SymmetricKey, auth: &AuthData) -> Result<String, FerryError> {
    let json = Zeroizing::new(serde_json::to_vec(auth)?);
    symmetric::encrypt(key, &json)
}

fn decrypt_auth_data(key: &SymmetricKey, ciphertext: &str) -> Result<AuthData, FerryError> {
    let json = symmetric::decrypt(key, ciphertext)?;
    serde_json::from_slice(&json)
        .map_err(|_| FerryError::Credential("decrypted payload is not valid auth data".into()))
}

/// First layer: encrypt mid-flow auth data with the job's session key.
pub fn encrypt_initial_auth_data(
    session_key: &SymmetricKey,
    auth: &AuthData,
) -> Result<String, FerryError> {
    encrypt_auth_data(session_key, auth)
}

pub fn decrypt_initial_auth_data(
    session_key: &SymmetricKey,
    ciphertext: &str,
) -> Result<AuthData, FerryError> {
    decrypt_auth_data(session_key, ciphertext)
}

/// Second-layer ciphertexts as persisted in the job record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedCredentials {
    pub encrypted_export_auth_data: String,
    pub encrypted_import_auth_data: String,
    /// The one-time key, wrapped with the worker's public key.
    pub encrypted_outer_key: String,
}

impl SealedCredentials {
    /// Read the sealed fields from a job's authorization record.
    pub fn from_authorization(auth: &JobAuthorization) -> Result<Self, FerryError> {
        let field = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| FerryError::Credential(format!("job has no {name}")))
        };
        Ok(Self {
            encrypted_export_auth_data: field(&auth.encrypted_export_auth_data, "encrypted export auth data")?,
            encrypted_import_auth_data: field(&auth.encrypted_import_auth_data, "encrypted import auth data")?,
            encrypted_outer_key: field(&auth.encrypted_outer_key, "wrapped key")?,
        })
    }

    /// Write the sealed fields into a job's authorization record.
    pub fn apply_to(self, auth: &mut JobAuthorization) {
        auth.encrypted_export_auth_data = Some(self.encrypted_export_auth_data);
        auth.encrypted_import_auth_data = Some(self.encrypted_import_auth_data);
        auth.encrypted_outer_key = Some(self.encrypted_outer_key);
        auth.encryption_scheme = Some(ENCRYPTION_SCHEME.to_string());
    }
}

/// Second layer: seal both sides' final credentials for one worker.
///
/// A fresh one-time key encrypts both payloads and is then wrapped with the
/// worker's public key; the plaintext one-time key is dropped (and zeroed)
/// before this returns.
pub fn seal_final_credentials(
    worker_public_key: &str,
    export_auth: &AuthData,
    import_auth: &AuthData,
) -> Result<SealedCredentials, FerryError> {
    let public_key = PublicKey::decode(worker_public_key)?;
    let one_time_key = SymmetricKey::generate()?;
    let sealed = SealedCredentials {
        encrypted_export_auth_data: encrypt_auth_data(&one_time_key, export_auth)?,
        encrypted_import_auth_data: encrypt_auth_data(&one_time_key, import_auth)?,
        encrypted_outer_key: public_key.wrap_key(&one_time_key)?,
    };
    debug!(
        export = export_auth.kind(),
        import = import_auth.kind(),
        "sealed final credentials for worker"
    );
    Ok(sealed)
}

/// Recover both sides' final credentials with the worker's private key.
pub fn open_final_credentials(
    keypair: &WorkerKeyPair,
    sealed: &SealedCredentials,
) -> Result<(AuthData, AuthData), FerryError> {
    let one_time_key = keypair.unwrap_key(&sealed.encrypted_outer_key)?;
    let export_auth = decrypt_auth_data(&one_time_key, &sealed.encrypted_export_auth_data)?;
    let import_auth = decrypt_auth_data(&one_time_key, &sealed.encrypted_import_auth_data)?;
    Ok((export_auth, import_auth))
}
