//! Configuration handling for the Meshtastic client.
//!
//! This module reads a YAML configuration file and `MESHTASTIC_*`
//! environment variables into one [`ClientConfig`].

use anyhow::{Context, Result};
use meshtastic_crypto::{KeyTable, DEFAULT_CHANNEL, DEFAULT_PSK_SENTINEL};
use meshtastic_receive::{MessageFilter, ReceiveOptions};
use meshtastic_session::{ConfigMode, MqttSettings, TopicConfig};
use meshtastic_wire::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Node id used as sender, `!hex` or integer
    pub node_id: NodeId,
    /// Channel name to base64 PSK
    pub psks: BTreeMap<String, String>,
    /// Broker settings
    pub mqtt: MqttConfig,
    /// Serial device settings
    pub serial: SerialSettings,
    /// Receive path settings
    pub receive: ReceiveConfig,
    /// Pause between text chunks, humantime syntax
    pub chunk_delay: String,
    /// Skip the node database during the handshake
    pub nodeless: bool,
    /// Log level directive
    pub log_level: String,
}

/// Broker connection and topic layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Connection settings
    #[serde(flatten)]
    pub settings: MqttSettings,
    /// Topic layout
    #[serde(flatten)]
    pub topics: TopicConfig,
}

/// UART settings handed to the serial driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Device path
    pub device: String,
    /// Baud rate
    pub baud: u32,
    /// Data bits, parity and stop bits
    pub mode: String,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud: 115_200,
            mode: "8N1".to_string(),
        }
    }
}

/// Receive path settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiveConfig {
    /// Comma separated substrings every shown message must contain
    pub include: Option<String>,
    /// Comma separated substrings no shown message may contain
    pub exclude: Option<String>,
    /// Reverse geocode positions
    pub gps_metadata: bool,
    /// Attach raw envelopes as hex
    pub include_raw: bool,
    /// Payloads are JSON envelopes
    pub json: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut psks = BTreeMap::new();
        psks.insert(DEFAULT_CHANNEL.to_string(), DEFAULT_PSK_SENTINEL.to_string());
        Self {
            node_id: NodeId::DEFAULT_SENDER,
            psks,
            mqtt: MqttConfig::default(),
            serial: SerialSettings::default(),
            receive: ReceiveConfig::default(),
            chunk_delay: "500ms".to_string(),
            nodeless: false,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<ClientConfig>(&content) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file {:?} ({}), using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                warn!("Config file {:?} not found, using defaults", path);
                Self::default()
            }
        };

        config.apply_environment_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        info!(
            "Final client configuration: node_id={}, broker={}, region={}, serial={}",
            config.node_id,
            config.mqtt.settings.endpoint(),
            config.mqtt.topics.region,
            config.serial.device
        );
        Ok(config)
    }

    /// Apply `MESHTASTIC_*` overrides looked up through `lookup`
    pub fn apply_environment_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(node_id) = lookup("MESHTASTIC_NODE_ID") {
            match NodeId::parse(&node_id) {
                Ok(id) => {
                    self.node_id = id;
                    info!("Node ID overridden by environment: {}", id);
                }
                Err(e) => warn!("Ignoring MESHTASTIC_NODE_ID: {}", e),
            }
        }

        if let Some(host) = lookup("MESHTASTIC_MQTT_HOST") {
            info!("MQTT host overridden by environment: {}", host);
            self.mqtt.settings.host = host;
        }

        if let Some(port) = lookup("MESHTASTIC_MQTT_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.mqtt.settings.port = port;
                info!("MQTT port overridden by environment: {}", port);
            }
        }

        if let Some(region) = lookup("MESHTASTIC_REGION") {
            info!("Region overridden by environment: {}", region);
            self.mqtt.topics.region = region;
        }

        if let Some(device) = lookup("MESHTASTIC_SERIAL_DEVICE") {
            info!("Serial device overridden by environment: {}", device);
            self.serial.device = device;
        }

        if let Some(level) = lookup("MESHTASTIC_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// Reject keys and durations that cannot be used
    pub fn validate(&self) -> Result<()> {
        self.key_table()?;
        self.chunk_delay()?;
        Ok(())
    }

    /// Channel keys, canonicalized
    pub fn key_table(&self) -> Result<KeyTable> {
        KeyTable::from_config(&self.psks).context("Invalid PSK in configuration")
    }

    /// Pause between text chunks
    pub fn chunk_delay(&self) -> Result<Duration> {
        humantime::parse_duration(&self.chunk_delay)
            .with_context(|| format!("Invalid chunk_delay {:?}", self.chunk_delay))
    }

    /// Handshake mode
    pub fn config_mode(&self) -> ConfigMode {
        if self.nodeless {
            ConfigMode::Nodeless
        } else {
            ConfigMode::Full
        }
    }

    /// Receive pipeline options
    pub fn receive_options(&self) -> ReceiveOptions {
        ReceiveOptions {
            json: self.receive.json,
            include_raw: self.receive.include_raw,
            gps_metadata: self.receive.gps_metadata,
            filter: MessageFilter::parse(
                self.receive.include.as_deref(),
                self.receive.exclude.as_deref(),
            ),
            ..ReceiveOptions::default()
        }
    }
}
