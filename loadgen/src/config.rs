//! Configuration management for the load generator
//!
//! This module resolves the [`LoadConfig`] for one run: built-in defaults,
//! then an optional TOML file, then command-line overrides. The merged result
//! is validated before any dialing starts.

use anyhow::{Context, Result};
use shared::{LoadConfig, ScheduleMode, TransportKind};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Values given on the command line. `None` keeps the file or default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub address: Option<String>,
    pub transport: Option<TransportKind>,
    pub max_connections: Option<u32>,
    pub rate: Option<u32>,
    pub hold: Option<Duration>,
    pub mode: Option<ScheduleMode>,
    pub channel_buffer_size: Option<usize>,
}

/// Loads and validates the load configuration.
pub struct ConfigManager {
    /// Optional TOML file with load settings
    pub config_file: Option<PathBuf>,
    /// Loaded configuration, `None` until `load_config` succeeds
    pub config: Option<LoadConfig>,
}

impl ConfigManager {
    /// Create a new configuration manager.
    /// When a configuration file is given it must exist and be a regular file.
    pub fn new(config_file: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = &config_file {
            if !path.exists() {
                return Err(anyhow::anyhow!(
                    "Configuration file does not exist: {}",
                    path.display()
                ));
            }

            if !path.is_file() {
                return Err(anyhow::anyhow!(
                    "Configuration path is not a file: {}",
                    path.display()
                ));
            }
        }

        Ok(Self {
            config_file,
            config: None,
        })
    }

    /// Read the configuration file (if any), apply overrides and validate.
    pub async fn load_config(&mut self, overrides: &ConfigOverrides) -> Result<&LoadConfig> {
        let mut config = match &self.config_file {
            Some(path) => {
                info!("Loading load configuration from {}", path.display());
                let content = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                toml::from_str::<LoadConfig>(&content).with_context(|| {
                    format!(
                        "Failed to parse {} - TOML syntax error in load configuration file",
                        path.display()
                    )
                })?
            }
            None => LoadConfig::default(),
        };

        apply_overrides(&mut config, overrides);

        config
            .validate()
            .context("Validation failed for load configuration")?;

        debug!("Load configuration parameters (including defaults):");
        debug!("  address: {}", config.address);
        debug!("  transport: {}", config.transport);
        debug!("  max_connections: {}", config.max_connections);
        debug!("  rate: {}", config.rate);
        debug!("  hold: {:?}", config.hold);
        debug!("  mode: {}", config.mode);
        debug!("  channel_buffer_size: {}", config.channel_buffer_size);

        Ok(self.config.insert(config))
    }
}

/// Apply command-line values on top of a file or default configuration
pub fn apply_overrides(config: &mut LoadConfig, overrides: &ConfigOverrides) {
    if let Some(address) = &overrides.address {
        config.address = address.clone();
    }
    if let Some(transport) = overrides.transport {
        config.transport = transport;
    }
    if let Some(max_connections) = overrides.max_connections {
        config.max_connections = max_connections;
    }
    if let Some(rate) = overrides.rate {
        config.rate = rate;
    }
    if let Some(hold) = overrides.hold {
        config.hold = hold;
    }
    if let Some(mode) = overrides.mode {
        config.mode = mode;
    }
    if let Some(size) = overrides.channel_buffer_size {
        config.channel_buffer_size = size;
    }
}
