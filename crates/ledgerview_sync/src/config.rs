//! Configuration for loaders, synced entities and networks.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Default number of offsets requested per chunk.
pub const DEFAULT_CHUNK_SIZE: u64 = 3000;

/// Default delay between the end of one cycle and the next automatic one.
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Configuration for chunked collection loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Width of every range query.
    pub chunk_size: u64,
    /// Offset of the first range query.
    pub start_offset: u64,
    /// Give up after this many chunks without a completion signal.
    /// `None` trusts the remote to signal completion.
    pub max_chunks: Option<u32>,
}

impl LoaderConfig {
    /// Creates a loader configuration with the given chunk size.
    pub fn new(chunk_size: u64) -> Self {
        Self {
            chunk_size,
            ..Self::default()
        }
    }

    /// Sets the start offset.
    #[must_use]
    pub fn with_start_offset(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self
    }

    /// Caps the number of chunks per load.
    #[must_use]
    pub fn with_max_chunks(mut self, max_chunks: u32) -> Self {
        self.max_chunks = Some(max_chunks);
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.chunk_size == 0 {
            return Err(SyncError::InvalidConfig("chunk_size must be > 0".into()));
        }
        if self.max_chunks == Some(0) {
            return Err(SyncError::InvalidConfig("max_chunks must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            start_offset: 0,
            max_chunks: None,
        }
    }
}

/// What automatic polling does after a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Schedule the next attempt after the usual delay.
    #[default]
    KeepPolling,
    /// Stop automatic polling until a manual refresh or key change.
    StopUntilManual,
}

/// Configuration for a synced entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Delay from the end of one cycle to the next automatic cycle.
    #[serde(rename = "refresh_delay_ms", with = "duration_ms")]
    pub refresh_delay: Duration,
    /// Behaviour of automatic polling after a failure.
    pub failure_policy: FailurePolicy,
}

impl EntityConfig {
    /// Creates an entity configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the refresh delay.
    #[must_use]
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            refresh_delay: DEFAULT_REFRESH_DELAY,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// A ledger network: where its query service lives and the contract
/// addresses queries import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network name.
    pub name: String,
    /// Base URL of the access node / query service.
    pub access_node: String,
    /// Contract name to account address.
    #[serde(default)]
    pub contracts: BTreeMap<String, String>,
}

impl NetworkConfig {
    /// Creates a network with no contracts.
    pub fn new(name: impl Into<String>, access_node: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access_node: access_node.into(),
            contracts: BTreeMap::new(),
        }
    }

    /// Adds a contract address.
    #[must_use]
    pub fn with_contract(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.contracts.insert(name.into(), address.into());
        self
    }

    /// Returns a contract address.
    pub fn contract(&self, name: &str) -> Option<&str> {
        self.contracts.get(name).map(String::as_str)
    }

    /// Production network.
    pub fn mainnet() -> Self {
        Self::new("mainnet", "https://access-mainnet-beta.onflow.org")
            .with_contract("topshot", "0b2a3299cc857e29")
            .with_contract("market", "c1e4f4f4c4257510")
    }

    /// Public test network.
    pub fn testnet() -> Self {
        Self::new("testnet", "https://access-testnet.onflow.org")
            .with_contract("topshot", "877931736ee77cff")
            .with_contract("market", "547f177b243b4d80")
    }

    /// Local emulator.
    pub fn local() -> Self {
        Self::new("local", "http://localhost:8080")
    }

    /// Names accepted by [`NetworkConfig::preset`].
    pub const PRESETS: [&'static str; 3] = ["mainnet", "testnet", "local"];

    /// Looks up a preset by name.
    pub fn preset(name: &str) -> SyncResult<Self> {
        match name {
            "mainnet" => Ok(Self::mainnet()),
            "testnet" => Ok(Self::testnet()),
            "local" => Ok(Self::local()),
            other => Err(SyncError::InvalidConfig(format!(
                "unknown network `{other}`"
            ))),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Top-level client configuration, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Target network.
    pub network: NetworkConfig,
    /// Chunked loading.
    pub loader: LoaderConfig,
    /// Refresh policy.
    pub entity: EntityConfig,
    /// Records per page in views.
    pub page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            loader: LoaderConfig::default(),
            entity: EntityConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Parses a JSON document; missing sections take their defaults.
    pub fn from_json_str(text: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| SyncError::InvalidConfig(format!("config parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SyncError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Checks every section.
    pub fn validate(&self) -> SyncResult<()> {
        self.loader.validate()?;
        if self.page_size == 0 {
            return Err(SyncError::InvalidConfig("page_size must be > 0".into()));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loader_config_builder() {
        let config = LoaderConfig::new(10).with_start_offset(1).with_max_chunks(50);
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.start_offset, 1);
        assert_eq!(config.max_chunks, Some(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loader_config_rejects_zero() {
        assert!(LoaderConfig::new(0).validate().is_err());
        assert!(LoaderConfig::new(5).with_max_chunks(0).validate().is_err());
    }

    #[test]
    fn entity_config_defaults() {
        let config = EntityConfig::default();
        assert_eq!(config.refresh_delay, Duration::from_secs(5));
        assert_eq!(config.failure_policy, FailurePolicy::KeepPolling);
    }

    #[test]
    fn network_presets() {
        let main = NetworkConfig::preset("mainnet").unwrap();
        assert_eq!(main.contract("topshot"), Some("0b2a3299cc857e29"));
        assert_eq!(
            NetworkConfig::preset("testnet").unwrap().contract("market"),
            Some("547f177b243b4d80")
        );
        assert!(NetworkConfig::local().contracts.is_empty());
        assert!(matches!(
            NetworkConfig::preset("devnet"),
            Err(SyncError::InvalidConfig(_))
        ));
    }

    #[test]
    fn client_config_partial_json() {
        let config = ClientConfig::from_json_str(
            r#"{
                "loader": {"chunk_size": 500, "start_offset": 1},
                "entity": {"refresh_delay_ms": 2500, "failure_policy": "stop_until_manual"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.network, NetworkConfig::mainnet());
        assert_eq!(config.loader.chunk_size, 500);
        assert_eq!(config.loader.max_chunks, None);
        assert_eq!(config.entity.refresh_delay, Duration::from_millis(2500));
        assert_eq!(config.entity.failure_policy, FailurePolicy::StopUntilManual);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn client_config_rejects_invalid() {
        assert!(ClientConfig::from_json_str(r#"{"page_size": 0}"#).is_err());
        assert!(ClientConfig::from_json_str(r#"{"loader": {"chunk_size": 0}}"#).is_err());
        assert!(ClientConfig::from_json_str("[]").is_err());
    }

    #[test]
    fn client_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"network": {{"name": "local", "access_node": "http://127.0.0.1:3569"}}}}"#)
            .unwrap();

        let config = ClientConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.network.access_node, "http://127.0.0.1:3569");
        assert!(config.network.contracts.is_empty());

        assert!(ClientConfig::from_json_file("/definitely/not/here.json").is_err());
    }

    #[test]
    fn entity_config_serializes_millis() {
        let json = serde_json::to_value(EntityConfig::default()).unwrap();
        assert_eq!(json["refresh_delay_ms"], 5000);
        assert_eq!(json["failure_policy"], "keep_polling");
    }
}
