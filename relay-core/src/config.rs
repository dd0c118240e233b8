//! Configuration for the relay

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// HTTP listen address
    pub listen_addr: String,

    /// Bearer token expected from the upstream indexer
    pub indexer_token: String,

    /// Ledger RPC configuration
    pub ledger: LedgerConfig,

    /// Matching configuration
    pub matching: MatchingConfig,

    /// Actor runtime configuration
    pub actors: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/relay"),
            service_name: "relay-core".to_string(),
            listen_addr: "0.0.0.0:8080".to_string(),
            indexer_token: String::new(),
            ledger: LedgerConfig::default(),
            matching: MatchingConfig::default(),
            actors: ActorConfig::default(),
        }
    }
}

/// Ledger RPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the chain
    pub rpc_url: String,

    /// Factory account that owns the per-bank subaccounts
    pub factory_account: String,

    /// Fixed computational budget attached to settlement calls
    pub gas_budget: u64,

    /// HTTP timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:3030".to_string(),
            factory_account: "factory.test".to_string(),
            gas_budget: 300_000_000_000_000,
            timeout_secs: 30,
        }
    }
}

/// Matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Timestamp tolerance between the two legs (milliseconds).
    /// Deployments run anywhere from one minute to two hours.
    pub timestamp_tolerance_ms: i64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            timestamp_tolerance_ms: matching_core::DEFAULT_TIMESTAMP_TOLERANCE_MS,
        }
    }
}

/// Actor runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Mailbox capacity per actor (bounded for backpressure)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 64,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load defaults with environment overrides
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("RELAY_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(addr) = std::env::var("RELAY_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Ok(token) = std::env::var("RELAY_INDEXER_TOKEN") {
            config.indexer_token = token;
        }

        if let Ok(url) = std::env::var("RELAY_RPC_URL") {
            config.ledger.rpc_url = url;
        }

        if let Ok(account) = std::env::var("RELAY_FACTORY_ACCOUNT") {
            config.ledger.factory_account = account;
        }

        if let Ok(tolerance) = std::env::var("RELAY_TIMESTAMP_TOLERANCE_MS") {
            config.matching.timestamp_tolerance_ms = tolerance
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid tolerance: {}", e)))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "relay-core");
        assert_eq!(config.matching.timestamp_tolerance_ms, 60_000);
        assert_eq!(config.ledger.gas_budget, 300_000_000_000_000);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            data_dir = "/tmp/relay"
            service_name = "relay-core"
            listen_addr = "127.0.0.1:9000"
            indexer_token = "secret"

            [ledger]
            rpc_url = "http://rpc.example:3030"
            factory_account = "factory.example"
            gas_budget = 300000000000000
            timeout_secs = 10

            [matching]
            timestamp_tolerance_ms = 7200000

            [actors]
            mailbox_capacity = 32
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.matching.timestamp_tolerance_ms, 7_200_000);
        assert_eq!(config.actors.mailbox_capacity, 32);
    }
}
