//! fairsend.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("node pool must contain at least one node")]
    NoNodes,

    #[error("invalid {field} range: min {min} > max {max}")]
    InvertedRange {
        field: &'static str,
        min: u64,
        max: u64,
    },

    #[error("files.min must be at least 1")]
    NoFilesPerClient,

    #[error("files.weight_bands must not be empty")]
    NoWeightBands,

    #[error("invalid weight band [{0}, {1}]: bounds must be positive and ordered")]
    InvalidWeightBand(u64, u64),

    #[error("tick_interval_ms must be positive")]
    ZeroInterval,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub clients: ClientsConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    /// Size of the fixed node pool.
    #[serde(default = "default_nodes")]
    pub nodes: u32,
    /// Cadence of the tick source.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Seed for the workload generator. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

/// Size range of the generated client population.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientsConfig {
    #[serde(default = "default_clients_min")]
    pub min: u32,
    #[serde(default = "default_clients_max")]
    pub max: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilesConfig {
    /// Files per generated client, inclusive range.
    #[serde(default = "default_files_min")]
    pub min: u32,
    #[serde(default = "default_files_max")]
    pub max: u32,
    /// Weight bands `[low, high]`. One band is picked uniformly, then a
    /// weight uniformly inside it.
    #[serde(default = "default_weight_bands")]
    pub weight_bands: Vec<[u64; 2]>,
}

fn default_nodes() -> u32 {
    5
}

fn default_tick_interval_ms() -> u64 {
    1
}

fn default_clients_min() -> u32 {
    5
}

fn default_clients_max() -> u32 {
    8
}

fn default_files_min() -> u32 {
    3
}

fn default_files_max() -> u32 {
    6
}

fn default_weight_bands() -> Vec<[u64; 2]> {
    vec![[10, 1_000], [100, 10_000], [10_000, 100_000]]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            tick_interval_ms: default_tick_interval_ms(),
            seed: None,
        }
    }
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            min: default_clients_min(),
            max: default_clients_max(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            min: default_files_min(),
            max: default_files_max(),
            weight_bands: default_weight_bands(),
        }
    }
}

impl SimConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a config with the default workload and a fixed seed.
    pub fn scaffold(seed: u64) -> Self {
        let mut config = SimConfig::default();
        config.simulation.seed = Some(seed);
        config
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.simulation.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.nodes == 0 {
            return Err(ConfigError::NoNodes);
        }
        if self.simulation.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.clients.min > self.clients.max {
            return Err(ConfigError::InvertedRange {
                field: "clients",
                min: self.clients.min.into(),
                max: self.clients.max.into(),
            });
        }
        if self.files.min == 0 {
            return Err(ConfigError::NoFilesPerClient);
        }
        if self.files.min > self.files.max {
            return Err(ConfigError::InvertedRange {
                field: "files",
                min: self.files.min.into(),
                max: self.files.max.into(),
            });
        }
        if self.files.weight_bands.is_empty() {
            return Err(ConfigError::NoWeightBands);
        }
        for &[low, high] in &self.files.weight_bands {
            if low == 0 || low > high {
                return Err(ConfigError::InvalidWeightBand(low, high));
            }
        }
        Ok(())
    }
}
