// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./ferry.toml` > `~/.config/ferry/ferry.toml` > `/etc/ferry/ferry.toml`,
//! with environment variable overrides via the `FERRY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::FerryConfig;

const SYSTEM_CONFIG: &str = "/etc/ferry/ferry.toml";
const LOCAL_CONFIG: &str = "ferry.toml";

/// Sections whose env keys are split on the first underscore.
const SECTIONS: &[&str] = &["storage", "worker", "crypto", "transfer", "gateway", "logging"];

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ferry/ferry.toml`
/// 3. `~/.config/ferry/ferry.toml`
/// 4. `./ferry.toml`
/// 5. `FERRY_*` environment variables
pub fn load_config() -> Result<FerryConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the compiled defaults.
pub fn load_config_from_str(toml_content: &str) -> Result<FerryConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one file with env var overrides (no hierarchy lookup).
pub fn load_config_from_path(path: &Path) -> Result<FerryConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

pub(crate) fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("ferry").join("ferry.toml"))
}

pub(crate) fn candidate_paths() -> Vec<std::path::PathBuf> {
    let mut paths = vec![std::path::PathBuf::from(SYSTEM_CONFIG)];
    paths.extend(user_config_path());
    paths.push(std::path::PathBuf::from(LOCAL_CONFIG));
    paths
}

/// Env provider mapping `FERRY_SECTION_KEY` to `section.key`.
///
/// Uses `Env::map()` rather than `split("_")` so keys that contain underscores
/// (`FERRY_WORKER_POLL_INTERVAL_SECS`) map to `worker.poll_interval_secs`.
/// Figment hands the key over with its original case.
fn env_provider() -> Env {
    Env::prefixed("FERRY_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("worker_poll_interval_secs"), "worker.poll_interval_secs");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("ferry.toml", "[worker]\npoll_interval_secs = 7\n")?;
            jail.set_env("FERRY_WORKER_POLL_INTERVAL_SECS", "3");
            let config = load_config_from_path(Path::new("ferry.toml"))?;
            assert_eq!(config.worker.poll_interval_secs, 3);
            Ok(())
        });
    }

    #[test]
    fn env_sets_keys_absent_from_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("ferry.toml", "")?;
            jail.set_env("FERRY_STORAGE_DATABASE_PATH", "/var/lib/ferry/jobs.db");
            jail.set_env("FERRY_TRANSFER_IMPORT_BATCH_SIZE", "10");
            let config = load_config_from_path(Path::new("ferry.toml"))?;
            assert_eq!(config.storage.database_path, "/var/lib/ferry/jobs.db");
            assert_eq!(config.transfer.import_batch_size, 10);
            Ok(())
        });
    }
}
