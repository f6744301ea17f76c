//! Sensor node configuration

use std::time::Duration;

use bridge_sdk::{BridgeGain, DEFAULT_ATTACH_TIMEOUT};
use serde::{Deserialize, Serialize};

/// Per-node settings applied during configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Bounded wait for each channel's attachment (ms)
    #[serde(default = "default_attach_timeout_ms")]
    pub attach_timeout_ms: u64,
    /// Gain applied to each channel right after it attaches
    #[serde(default)]
    pub initial_gain: Option<BridgeGain>,
    /// Enable bridge excitation right after attachment
    #[serde(default)]
    pub enable_on_attach: bool,
}

fn default_attach_timeout_ms() -> u64 {
    DEFAULT_ATTACH_TIMEOUT.as_millis() as u64
}

impl NodeConfig {
    /// Attach timeout as a duration
    pub fn attach_timeout(&self) -> Duration {
        Duration::from_millis(self.attach_timeout_ms)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            attach_timeout_ms: default_attach_timeout_ms(),
            initial_gain: None,
            enable_on_attach: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.attach_timeout(), Duration::from_millis(5000));
        assert!(config.initial_gain.is_none());
        assert!(!config.enable_on_attach);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: NodeConfig = serde_json::from_str(r#"{"initial_gain":"X32"}"#).unwrap();
        assert_eq!(config.attach_timeout_ms, 5000);
        assert_eq!(config.initial_gain, Some(BridgeGain::X32));
    }
}
