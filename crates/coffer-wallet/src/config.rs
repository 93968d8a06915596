//! Wallet configuration.
//!
//! [`WalletConfig::default`] gives a testnet wallet with zero fee, the
//! select-all coin selector, and files under the platform data directory.
//! [`WalletConfig::load`] layers an optional TOML file and then `COFFER_*`
//! environment variables (e.g. `COFFER_DEFAULT_FEE=50`) over the defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use coffer_core::address::Network;
use coffer_core::constants::DEFAULT_FEE;

use crate::coin_selection::SelectionStrategy;
use crate::error::WalletError;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "COFFER";

/// Configuration for a wallet instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub network: Network,
    /// Fee applied by [`Wallet::pay`](crate::wallet::Wallet::pay), in base units.
    pub default_fee: u64,
    pub selection: SelectionStrategy,
    /// Exclude unconfirmed outputs from coin selection.
    pub require_confirmed: bool,
    pub keystore_path: PathBuf,
    /// Ledger snapshot file used by the CLI.
    pub ledger_path: PathBuf,
    /// Log filter string (e.g. "info", "coffer_wallet=debug").
    pub log_level: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            network: Network::Testnet,
            default_fee: DEFAULT_FEE,
            selection: SelectionStrategy::default(),
            require_confirmed: false,
            keystore_path: data_dir.join("keys.json"),
            ledger_path: data_dir.join("ledger.json"),
            log_level: "info".to_string(),
        }
    }
}

/// Root directory for wallet files.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coffer")
}

impl WalletConfig {
    /// Load defaults, then `file` (if given), then environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self, WalletError> {
        Self::load_layered(file, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load_layered(file: Option<&Path>, env: config::Environment) -> Result<Self, WalletError> {
        let defaults = config::Config::try_from(&WalletConfig::default())
            .map_err(|e| WalletError::Config(e.to_string()))?;
        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder
            .add_source(env.try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| WalletError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_testnet_zero_fee_select_all() {
        let cfg = WalletConfig::default();
        assert_eq!(cfg.network, Network::Testnet);
        assert_eq!(cfg.default_fee, 0);
        assert_eq!(cfg.selection, SelectionStrategy::SelectAll);
        assert!(!cfg.require_confirmed);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn default_paths_under_coffer_dir() {
        let cfg = WalletConfig::default();
        assert!(cfg.keystore_path.ends_with("coffer/keys.json"));
        assert!(cfg.ledger_path.ends_with("coffer/ledger.json"));
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coffer.toml");
        std::fs::write(
            &path,
            "network = \"mainnet\"\ndefault_fee = 50\nselection = \"largest-first\"\nrequire_confirmed = true\n",
        )
        .unwrap();

        let cfg = WalletConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.network, Network::Mainnet);
        assert_eq!(cfg.default_fee, 50);
        assert_eq!(cfg.selection, SelectionStrategy::LargestFirst);
        assert!(cfg.require_confirmed);
        assert_eq!(cfg.log_level, "info");
    }

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coffer.toml");
        std::fs::write(&path, "default_fee = 50
require_confirmed = false
").unwrap();

        let cfg = WalletConfig::load_layered(
            Some(&path),
            env(&[("COFFER_DEFAULT_FEE", "75"), ("COFFER_REQUIRE_CONFIRMED", "true")]),
        )
        .unwrap();
        assert_eq!(cfg.default_fee, 75);
        assert!(cfg.require_confirmed);
        assert_eq!(cfg.network, Network::Testnet);
    }

    #[test]
    fn env_without_prefix_is_ignored() {
        let cfg = WalletConfig::load_layered(None, env(&[("DEFAULT_FEE", "75")])).unwrap();
        assert_eq!(cfg.default_fee, DEFAULT_FEE);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = WalletConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, WalletError::Config(_)));
    }

    #[test]
    fn bad_value_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coffer.toml");
        std::fs::write(&path, "selection = \"random\"\n").unwrap();
        assert!(matches!(
            WalletConfig::load(Some(&path)).unwrap_err(),
            WalletError::Config(_)
        ));
    }

    #[test]
    fn config_is_clone_and_debug() {
        let cfg = WalletConfig::default();
        let debug = format!("{:?}", cfg.clone());
        assert!(debug.contains("WalletConfig"));
    }
}
