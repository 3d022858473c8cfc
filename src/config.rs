use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Scalar configuration for one side of the proxy pair. No core logic depends
/// on these values beyond parameterizing addresses and the call timeout.
#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfig {
    /// where this side's RPC server listens
    pub bind_addr: String,
    /// the other process's RPC address
    pub peer_addr: String,
    /// optional read-only status HTTP surface
    #[serde(default)]
    pub status_addr: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    1000
}

impl ProxyConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: ProxyConfig = toml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
