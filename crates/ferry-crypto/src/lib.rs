// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential encryption pipeline.
//!
//! Two layers keep plaintext credentials out of the job store:
//!
//! - **First layer.** Mid-flow "initial" auth data is encrypted with the job's
//!   symmetric session key, generated at job creation.
//! - **Second layer.** Final credentials are encrypted with a fresh one-time
//!   symmetric key, which is itself wrapped with the RSA public key of the
//!   worker that reserved the job. Only that worker can unwrap it.
//!
//! All symmetric encryption is AES-256-GCM with a random nonce prepended to
//! the ciphertext, base64url-encoded without padding.

pub mod asymmetric;
pub mod credentials;
pub mod symmetric;

pub use asymmetric::{PublicKey, WorkerKeyPair};
pub use credentials::{
    ENCRYPTION_SCHEME, SealedCredentials, decrypt_initial_auth_data, encrypt_initial_auth_data,
    open_final_credentials, seal_final_credentials,
};
pub use symmetric::SymmetricKey;
