//! Indexer configuration, fluent builder and runtime state.
//!
//! ```rust
//! use dfindex_core::{IndexerBuilder, Network};
//!
//! let config = IndexerBuilder::new()
//!     .network(Network::Regtest)
//!     .start_height(0)
//!     .poll_interval_ms(500)
//!     .build_config();
//! assert_eq!(config.network.price_interval(), 6);
//! ```

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;
use crate::network::Network;

/// Configuration for an indexer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Name of this indexer, used in log fields.
    pub id: String,
    pub network: Network,
    /// First height to index when the store is empty.
    pub start_height: u32,
    /// Node polling interval once caught up (milliseconds).
    pub poll_interval_ms: u64,
    /// Rows fetched per page when scanning history backwards.
    pub history_page_size: usize,
    pub log: LogConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            id: "dfindex".into(),
            network: Network::Mainnet,
            start_height: 0,
            poll_interval_ms: 2000,
            history_page_size: 100,
            log: LogConfig::default(),
        }
    }
}

/// Fluent builder for `IndexerConfig`.
#[derive(Default)]
pub struct IndexerBuilder {
    config: IndexerConfig,
}

impl IndexerBuilder {
    pub fn new() -> Self {
        Self {
            config: IndexerConfig::default(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    pub fn network(mut self, network: Network) -> Self {
        self.config.network = network;
        self
    }

    pub fn start_height(mut self, height: u32) -> Self {
        self.config.start_height = height;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Page size for backward history scans. Zero is raised to one.
    pub fn history_page_size(mut self, size: usize) -> Self {
        self.config.history_page_size = size.max(1);
        self
    }

    pub fn log(mut self, log: LogConfig) -> Self {
        self.config.log = log;
        self
    }

    pub fn build_config(self) -> IndexerConfig {
        self.config
    }
}

/// Runtime state of the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexerState {
    /// Not yet started.
    Idle,
    /// Indexing blocks below the node tip.
    Syncing,
    /// Caught up, polling for new blocks.
    Live,
    /// Invalidating blocks dropped by a reorg.
    ReorgRecovery,
    /// Terminated after a shutdown signal.
    Stopped,
    /// Encountered an unrecoverable error.
    Error,
}

impl std::fmt::Display for IndexerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Syncing => write!(f, "syncing"),
            Self::Live => write!(f, "live"),
            Self::ReorgRecovery => write!(f, "reorg-recovery"),
            Self::Stopped => write!(f, "stopped"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let cfg = IndexerBuilder::new().build_config();
        assert_eq!(cfg.network, Network::Mainnet);
        assert_eq!(cfg.poll_interval_ms, 2000);
        assert_eq!(cfg.history_page_size, 100);
    }

    #[test]
    fn builder_custom() {
        let cfg = IndexerBuilder::new()
            .id("regtest-indexer")
            .network(Network::Regtest)
            .start_height(100)
            .history_page_size(0)
            .build_config();
        assert_eq!(cfg.id, "regtest-indexer");
        assert_eq!(cfg.start_height, 100);
        assert_eq!(cfg.history_page_size, 1);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: IndexerConfig = serde_json::from_str(r#"{"network":"regtest"}"#).unwrap();
        assert_eq!(cfg.network, Network::Regtest);
        assert_eq!(cfg.log.level, "info");
    }
}
