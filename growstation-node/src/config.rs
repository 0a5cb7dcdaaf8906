//! Host configuration
//!
//! Loads `node.toml` from the path given on the command line, or falls back
//! to the copy embedded at build time.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use growstation_core::NodeConfig;
use growstation_hal::CHANNEL_COUNT;

/// Embedded default configuration
/// Edit node.toml and rebuild to change it
pub const EMBEDDED_CONFIG: &str = include_str!("../node.toml");

/// Everything the host build reads from `node.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Runtime configuration handed to the core
    pub node: NodeConfig,
    pub storage: StorageSection,
    pub network: NetworkSection,
    pub analog: AnalogSection,
    pub probe: ProbeSection,
}

/// `[storage]`: directory standing in for the flash file system
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub root: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
        }
    }
}

/// `[network]`: address the HTTP listener binds to
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    pub bind: IpAddr,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

/// `[analog]`: raw values of the simulated probe front end
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalogSection {
    pub raw: [i16; CHANNEL_COUNT],
}

impl Default for AnalogSection {
    fn default() -> Self {
        Self {
            raw: [700, 1050, 1400, 1750],
        }
    }
}

/// `[probe]`: values reported by the system probe
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProbeSection {
    pub analog: u16,
}

impl HostConfig {
    /// Parse and validate a TOML document
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let config: HostConfig = toml::from_str(input).context("TOML parse error")?;
        config
            .node
            .validate()
            .map_err(|e| anyhow!("invalid [node] section: {:?}", e))?;
        Ok(config)
    }

    /// Load from `path`, or the embedded default when none is given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                let input = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Self::parse(&input).with_context(|| format!("in {}", path.display()))
            }
            None => {
                tracing::info!("Using embedded configuration");
                Self::parse(EMBEDDED_CONFIG).context("in embedded node.toml")
            }
        }
    }

    /// Socket address of the HTTP listener
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.network.bind, self.node.http_port)
    }

    /// Log the values that shape the node's behavior
    pub fn log_summary(&self) {
        let calibration = self.node.calibration;
        tracing::info!(
            "Config: hostname={}, port={}, sample every {} ms, idle timeout {} ms",
            self.node.hostname,
            self.node.http_port,
            self.node.sample_period_ms,
            self.node.idle_timeout_ms
        );
        tracing::info!("Calibration: wet={}, dry={}", calibration.wet, calibration.dry);
    }
}
