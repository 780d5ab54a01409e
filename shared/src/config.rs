//! Configuration types and validation for the connection load generator
//!
//! This module defines the load configuration consumed by the dial scheduler,
//! including validation logic and serialization support.

use crate::defaults::*;
use crate::utils::{format_duration, parse_duration, split_host_port};
use crate::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Load configuration, merged from defaults, an optional TOML file and CLI flags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadConfig {
    /// Target address as host:port (e.g., "example.com:443" or "[::1]:8443")
    #[serde(default)]
    pub address: String,
    /// Transport used for every dial attempt (default: tls)
    #[serde(default = "default_transport")]
    pub transport: TransportKind,
    /// Number of dial attempts in the batch (default: 100)
    #[serde(default = "default_max_connections", alias = "connections")]
    pub max_connections: u32,
    /// Target rate in connections per second, 0 means unconstrained (default: 0)
    #[serde(default = "default_rate")]
    pub rate: u32,
    /// How long opened connections are held before teardown (default: 5m)
    #[serde(
        default = "default_hold",
        alias = "wait",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub hold: Duration,
    /// Whether attempts run one after another or all at once (default: sequential)
    #[serde(default = "default_mode")]
    pub mode: ScheduleMode,
    /// Result channel capacity in concurrent mode (default: 1000)
    #[serde(default = "default_channel_buffer_size")]
    pub channel_buffer_size: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            transport: default_transport(),
            max_connections: default_max_connections(),
            rate: default_rate(),
            hold: default_hold(),
            mode: default_mode(),
            channel_buffer_size: default_channel_buffer_size(),
        }
    }
}

impl LoadConfig {
    /// Validate the configuration before any dialing begins
    pub fn validate(&self) -> crate::Result<()> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "address is required (e.g. www.myhost.com:443)".to_string(),
            )
            .into());
        }

        let (host, port) = split_host_port(&self.address).ok_or_else(|| {
            ConfigError::Validation(format!(
                "Invalid address '{}': expected host:port",
                self.address
            ))
        })?;

        if host.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Invalid address '{}': host cannot be empty",
                self.address
            ))
            .into());
        }

        match port.parse::<u16>() {
            Ok(0) | Err(_) => {
                return Err(ConfigError::Validation(format!(
                    "Invalid address '{}': port must be a number between 1 and 65535",
                    self.address
                ))
                .into());
            }
            Ok(_) => {}
        }

        if self.max_connections == 0 {
            return Err(ConfigError::Validation(
                "Invalid max_connections: 0. Value must be greater than 0.".to_string(),
            )
            .into());
        }

        if self.channel_buffer_size == 0 {
            return Err(ConfigError::Validation(
                "Invalid channel_buffer_size: 0. Value must be greater than 0.".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

/// Transport used to establish each connection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Plain TCP stream socket
    Tcp,
    /// TLS over TCP, certificate verification disabled
    Tls,
    /// WebSocket upgrade over plain TCP (`ws://`)
    Ws,
    /// WebSocket upgrade over TLS (`wss://`)
    TlsWs,
}

impl TransportKind {
    /// Whether a TLS handshake is part of the dial
    pub fn uses_tls(self) -> bool {
        matches!(self, TransportKind::Tls | TransportKind::TlsWs)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Tls => "tls",
            TransportKind::Ws => "ws",
            TransportKind::TlsWs => "tls-ws",
        };
        f.write_str(name)
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(TransportKind::Tcp),
            "tls" => Ok(TransportKind::Tls),
            "ws" => Ok(TransportKind::Ws),
            "tls-ws" | "wss" => Ok(TransportKind::TlsWs),
            other => Err(ConfigError::Config(format!(
                "Unknown transport '{}': expected one of tcp, tls, ws, tls-ws",
                other
            ))),
        }
    }
}

/// How the dial scheduler drives the batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// One attempt at a time, rate pause between consecutive attempts
    Sequential,
    /// One task per attempt, all launched at once
    Concurrent,
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleMode::Sequential => f.write_str("sequential"),
            ScheduleMode::Concurrent => f.write_str("concurrent"),
        }
    }
}

impl FromStr for ScheduleMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(ScheduleMode::Sequential),
            "concurrent" => Ok(ScheduleMode::Concurrent),
            other => Err(ConfigError::Config(format!(
                "Unknown mode '{}': expected sequential or concurrent",
                other
            ))),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*duration))
}
