use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::money::Unit;
use crate::transfer::TransitionPolicy;
use crate::wallet::WalletUnits;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Enables per-transition `TRANSFER_TRACE` events
    pub enable_tracing: bool,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

/// Transfer lifecycle settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    #[serde(default)]
    pub transition_policy: TransitionPolicy,
    /// Capacity of the bounded event queue; the oldest event is dropped when full
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
}

fn default_event_queue_capacity() -> usize {
    1024
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            transition_policy: TransitionPolicy::default(),
            event_queue_capacity: default_event_queue_capacity(),
        }
    }
}

/// Wallet replayed by the `transfer_replay` binary
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WalletConfig {
    pub units: WalletUnits,
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            units: WalletUnits::native(
                Unit::base("btc", "sat", "SAT"),
                Unit::new("btc", "btc", "BTC", 8),
            ),
            addresses: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`
    pub fn load(env: &str) -> anyhow::Result<Self> {
        Self::load_from(format!("config/{}.yaml", env))
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config yaml: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
