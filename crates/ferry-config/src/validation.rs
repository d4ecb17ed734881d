// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use ferry_core::retry::RetryStrategy;

use crate::diagnostic::ConfigError;
use crate::model::FerryConfig;

/// Smallest RSA modulus that can still wrap a 256-bit key with OAEP-SHA256.
const MIN_RSA_KEY_BITS: usize = 1024;

/// Largest batch most destination bulk-create APIs accept.
const MAX_IMPORT_BATCH_SIZE: usize = 50;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of stopping at the first one.
pub fn validate_config(config: &FerryConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if config.worker.poll_interval_secs == 0 {
        invalid("worker.poll_interval_secs must be at least 1".to_string());
    }
    if config.worker.credential_poll_interval_secs == 0 {
        invalid("worker.credential_poll_interval_secs must be at least 1".to_string());
    }
    if config.worker.credential_timeout_secs < config.worker.credential_poll_interval_secs {
        invalid(format!(
            "worker.credential_timeout_secs ({}) must not be shorter than worker.credential_poll_interval_secs ({})",
            config.worker.credential_timeout_secs, config.worker.credential_poll_interval_secs
        ));
    }
    if let Some(id) = &config.worker.instance_id
        && id.trim().is_empty()
    {
        invalid("worker.instance_id must not be blank when set".to_string());
    }

    if config.crypto.rsa_key_bits < MIN_RSA_KEY_BITS {
        invalid(format!(
            "crypto.rsa_key_bits must be at least {MIN_RSA_KEY_BITS}, got {}",
            config.crypto.rsa_key_bits
        ));
    }

    let batch = config.transfer.import_batch_size;
    if batch == 0 || batch > MAX_IMPORT_BATCH_SIZE {
        invalid(format!(
            "transfer.import_batch_size must be between 1 and {MAX_IMPORT_BATCH_SIZE}, got {batch}"
        ));
    }

    let retry = &config.transfer.retry;
    let strategies = retry
        .mappings
        .iter()
        .map(|m| &m.strategy)
        .chain(std::iter::once(&retry.default));
    for strategy in strategies {
        if let RetryStrategy::ExponentialBackoff { multiplier, .. } = strategy
            && *multiplier < 1.0
        {
            invalid(format!(
                "transfer.retry exponential multiplier must be >= 1.0, got {multiplier}"
            ));
        }
        if let RetryStrategy::Uniform { max_attempts: 0, .. }
        | RetryStrategy::ExponentialBackoff { max_attempts: 0, .. } = strategy
        {
            invalid("transfer.retry max_attempts must be at least 1".to_string());
        }
    }
    for (i, mapping) in retry.mappings.iter().enumerate() {
        if mapping.kinds.is_empty() {
            invalid(format!("transfer.retry.mappings[{i}].kinds must not be empty"));
        }
    }

    if !config.gateway.callback_base_url.starts_with("http://")
        && !config.gateway.callback_base_url.starts_with("https://")
    {
        invalid(format!(
            "gateway.callback_base_url must be an http(s) URL, got `{}`",
            config.gateway.callback_base_url
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
