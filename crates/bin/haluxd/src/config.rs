//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `halux.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use halux_adapter_mqtt::MqttConfig;
use halux_domain::device::Device;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which bus the dispatcher talks to.
    pub gateway: GatewayKind,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Broker connection settings.
    pub mqtt: MqttConfig,
    /// Dispatcher tuning.
    pub dispatcher: DispatcherConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Device catalog seed.
    pub devices: Vec<Device>,
}

/// Bus implementation selected at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    /// External MQTT broker.
    #[default]
    Mqtt,
    /// In-process loopback, no broker needed.
    Loopback,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Upper bound on a single gateway publish, in milliseconds.
    pub publish_timeout_ms: u64,
    /// Maximum number of retained log entries. Unbounded when absent.
    pub retention: Option<NonZeroUsize>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `halux.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("halux.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("HALUX_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("HALUX_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("HALUX_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = var("HALUX_GATEWAY") {
            match val.as_str() {
                "mqtt" => self.gateway = GatewayKind::Mqtt,
                "loopback" => self.gateway = GatewayKind::Loopback,
                _ => {}
            }
        }
        if let Some(val) = var("HALUX_BROKER_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Some(port) = var("HALUX_BROKER_PORT").and_then(|val| val.parse().ok()) {
            self.mqtt.broker_port = port;
        }
        if let Some(val) = var("HALUX_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.mqtt.broker_host.is_empty() {
            return Err(ConfigError::Validation(
                "broker host must not be empty".to_string(),
            ));
        }
        if self.mqtt.channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "channel capacity must be non-zero".to_string(),
            ));
        }
        if self.dispatcher.publish_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "publish timeout must be non-zero".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for device in &self.devices {
            if device.id.is_empty() {
                return Err(ConfigError::Validation(
                    "device id must not be empty".to_string(),
                ));
            }
            if !seen.insert(device.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate device id `{}`",
                    device.id
                )));
            }
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl DispatcherConfig {
    #[must_use]
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            publish_timeout_ms: 5000,
            retention: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "haluxd=info,halux_app=info,halux_adapter_mqtt=info,tower_http=debug"
                .to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
