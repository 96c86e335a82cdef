//! # Configuration
//!
//! Optional operator config at `~/.chop/config.json`. A missing file means
//! defaults; a present file overrides field by field.

use crate::accounts::DEFAULT_ACCOUNT_COUNT;
use crate::chain::DEFAULT_BLOCK_GAS_LIMIT;
use crate::errors::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Account-set configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Number of derived accounts.
    #[serde(default = "default_count")]
    pub count: usize,
    /// Funding per account in whole ETH.
    #[serde(default = "default_initial_balance")]
    pub initial_balance_eth: u64,
}

fn default_count() -> usize {
    DEFAULT_ACCOUNT_COUNT
}

fn default_initial_balance() -> u64 {
    100
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            initial_balance_eth: default_initial_balance(),
        }
    }
}

/// The operator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChopConfig {
    /// Block gas limit.
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Named EVM version. Informational: the embedded VM tracks one
    /// schedule.
    #[serde(default = "default_hardfork")]
    pub hardfork: String,
    /// Account-set settings.
    #[serde(default)]
    pub accounts: AccountsConfig,
}

fn default_gas_limit() -> u64 {
    DEFAULT_BLOCK_GAS_LIMIT
}

fn default_hardfork() -> String {
    "cancun".to_string()
}

impl Default for ChopConfig {
    fn default() -> Self {
        Self {
            gas_limit: default_gas_limit(),
            hardfork: default_hardfork(),
            accounts: AccountsConfig::default(),
        }
    }
}

/// Resolves `~/.chop/config.json`.
///
/// # Errors
///
/// `NoHomeDir` when the home directory cannot be resolved.
pub fn config_path() -> Result<PathBuf, StoreError> {
    dirs::home_dir()
        .map(|home| home.join(".chop").join("config.json"))
        .ok_or(StoreError::NoHomeDir)
}

/// Loads the config; a missing file yields defaults.
///
/// # Errors
///
/// `Io` on read failure, `MalformedJson` on parse failure.
pub fn load(path: &Path) -> Result<ChopConfig, StoreError> {
    if !path.exists() {
        return Ok(ChopConfig::default());
    }
    let raw = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| StoreError::malformed(path, e))
}

/// Saves the config, creating the parent directory as needed.
///
/// # Errors
///
/// `Io` on write failure.
pub fn save(path: &Path, config: &ChopConfig) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).map_err(|e| StoreError::io(path, e))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_defaults() {
        let dir = tempdir().unwrap();
        let config = load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, ChopConfig::default());
        assert_eq!(config.gas_limit, DEFAULT_BLOCK_GAS_LIMIT);
        assert_eq!(config.accounts.count, DEFAULT_ACCOUNT_COUNT);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = ChopConfig {
            gas_limit: 5_000_000,
            hardfork: "shanghai".to_string(),
            accounts: AccountsConfig {
                count: 3,
                initial_balance_eth: 42,
            },
        };
        save(&path, &config).unwrap();
        assert_eq!(load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "gas_limit": 1000000 }"#).unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.gas_limit, 1_000_000);
        assert_eq!(config.hardfork, "cancun");
        assert_eq!(config.accounts.count, DEFAULT_ACCOUNT_COUNT);
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{{{").unwrap();
        assert!(matches!(
            load(&path),
            Err(StoreError::MalformedJson { .. })
        ));
    }
}
