// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML configuration for the bridge.
//!
//! Defaults match the legacy logger deployment, so the binary runs without
//! a config file against a broker on localhost.

use crate::schema::Category;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    /// Broker connection settings.
    #[serde(default)]
    pub mqtt: MqttConfig,
    /// Output file per category.
    #[serde(default)]
    pub outputs: OutputConfig,
}

/// Broker connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Username, sent only together with `password`.
    pub username: Option<String>,
    /// Password, sent only together with `username`.
    pub password: Option<String>,
    /// Keepalive interval in seconds.
    pub keepalive_secs: u64,
    /// MQTT client identifier.
    pub client_id: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            keepalive_secs: 60,
            client_id: "ald-bridge".to_string(),
        }
    }
}

/// Output file paths, one per category.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub temperature: PathBuf,
    pub flow: PathBuf,
    pub pressure: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        // Legacy file names, kept for drop-in compatibility.
        Self {
            temperature: PathBuf::from("sample_temperatures.dat"),
            flow: PathBuf::from("flow.dat"),
            pressure: PathBuf::from("pressure.dat"),
        }
    }
}

impl OutputConfig {
    /// Destination path for a category.
    pub fn path_for(&self, category: Category) -> &Path {
        match category {
            Category::Temperature => &self.temperature,
            Category::Flow => &self.flow,
            Category::Pressure => &self.pressure,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = r#"
mqtt:
  host: "ald"
"#;

    const FULL_YAML: &str = r#"
mqtt:
  host: "broker.lab.example.com"
  port: 8883
  username: "ald"
  password: "test-password-placeholder"
  keepalive_secs: 30
  client_id: "ald-bridge-rig2"
outputs:
  temperature: "/data/ald/sample_temperatures.dat"
  flow: "/data/ald/flow.dat"
  pressure: "/data/ald/pressure.dat"
"#;

    #[test]
    fn test_config_defaults() {
        let config = BridgeConfig::default();

        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.keepalive_secs, 60);
        assert_eq!(config.mqtt.client_id, "ald-bridge");
        assert!(config.mqtt.username.is_none());

        assert_eq!(
            config.outputs.temperature,
            PathBuf::from("sample_temperatures.dat")
        );
        assert_eq!(config.outputs.flow, PathBuf::from("flow.dat"));
        assert_eq!(config.outputs.pressure, PathBuf::from("pressure.dat"));
    }

    #[test]
    fn test_config_parse_minimal() {
        let config = BridgeConfig::from_yaml(MINIMAL_YAML).expect("parse minimal yaml");

        assert_eq!(config.mqtt.host, "ald");
        // Unspecified fields fall back to defaults.
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.outputs.flow, PathBuf::from("flow.dat"));
    }

    #[test]
    fn test_config_parse_all_fields() {
        let config = BridgeConfig::from_yaml(FULL_YAML).expect("parse full yaml");

        assert_eq!(config.mqtt.host, "broker.lab.example.com");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.username.as_deref(), Some("ald"));
        assert_eq!(
            config.mqtt.password.as_deref(),
            Some("test-password-placeholder")
        );
        assert_eq!(config.mqtt.keepalive_secs, 30);
        assert_eq!(config.mqtt.client_id, "ald-bridge-rig2");

        assert_eq!(
            config.outputs.temperature,
            PathBuf::from("/data/ald/sample_temperatures.dat")
        );
    }

    #[test]
    fn test_path_for_covers_all_categories() {
        let outputs = OutputConfig::default();
        assert_eq!(
            outputs.path_for(Category::Temperature),
            Path::new("sample_temperatures.dat")
        );
        assert_eq!(outputs.path_for(Category::Flow), Path::new("flow.dat"));
        assert_eq!(
            outputs.path_for(Category::Pressure),
            Path::new("pressure.dat")
        );
    }
}
