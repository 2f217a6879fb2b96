//! Node configuration.

use crate::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Network (mainnet, testnet, regtest).
    #[serde(default = "default_network")]
    pub network: String,
    /// API configuration.
    #[serde(default)]
    pub api: ApiConfig,
    /// Wallet configuration.
    #[serde(default)]
    pub wallet: WalletConfig,
}

fn default_network() -> String {
    "mainnet".to_string()
}

/// API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API bind address.
    pub bind_address: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8332".to_string(),
        }
    }
}

/// Wallet configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WalletConfig {
    /// Hex-encoded secret keys to import at start.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Generate a fresh forging key when no keys are configured.
    #[serde(default)]
    pub generate_key: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            api: ApiConfig::default(),
            wallet: WalletConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load from a toml file (if it exists) and apply CLI overrides.
    pub fn load(path: &Path, args: &Args) -> Result<Self> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        } else {
            Self::default()
        };

        if let Some(network) = &args.network {
            config.network = network.clone();
        }
        if let Some(bind) = &args.api_bind {
            config.api.bind_address = bind.clone();
        }
        if args.generate_key {
            config.wallet.generate_key = true;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_args() -> Args {
        Args {
            config: "pocx-node.toml".into(),
            network: None,
            api_bind: None,
            generate_key: false,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = NodeConfig::load(Path::new("/nonexistent/pocx.toml"), &no_args()).unwrap();
        assert_eq!(config.network, "mainnet");
        assert_eq!(config.api.bind_address, "127.0.0.1:8332");
        assert!(config.wallet.keys.is_empty());
    }

    #[test]
    fn file_values_and_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "network = \"regtest\"\n[api]\nbind_address = \"0.0.0.0:9000\"\n[wallet]\nkeys = [\"42\"]"
        )
        .unwrap();

        let config = NodeConfig::load(&path, &no_args()).unwrap();
        assert_eq!(config.network, "regtest");
        assert_eq!(config.api.bind_address, "0.0.0.0:9000");
        assert_eq!(config.wallet.keys, vec!["42".to_string()]);

        let args = Args {
            network: Some("testnet".to_string()),
            ..no_args()
        };
        let config = NodeConfig::load(&path, &args).unwrap();
        assert_eq!(config.network, "testnet");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "network = [not toml").unwrap();
        assert!(NodeConfig::load(&path, &no_args()).is_err());
    }
}
