//! TOML configuration for a provisioning node.
//!
//! ```toml
//! [node]
//! role = "provisioner"            # or "device"
//! uuid = "00112233445566778899aabbccddeeff"
//!
//! [bearer]
//! retransmit_interval_ms = 500
//!
//! [transport]
//! bind = "0.0.0.0:4390"
//! target = "127.0.0.1:4391"
//!
//! [session]
//! payloads = ["0005", "01020304"]
//! ```
//!
//! Every section and field is optional except `node.uuid`.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use pbadv_core::DeviceUuid;
use pbadv_interfaces::UdpAdvConfig;
use pbadv_protocol::BearerConfig;
use pbadv_protocol::config::{
    DEFAULT_ACK_RETRANSMITS, DEFAULT_CLOSE_RETRANSMITS, DEFAULT_MAX_TX_SEGMENTS,
    DEFAULT_RX_CAPACITY,
};
use serde::Deserialize;

use crate::error::NodeError;

#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub bearer: BearerSection,
    #[serde(default)]
    pub transport: TransportSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub session: SessionSection,
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }

    /// The UUID the device answers to and the provisioner opens a link to.
    pub fn device_uuid(&self) -> Result<DeviceUuid, NodeError> {
        let hex_uuid = self
            .node
            .uuid
            .as_deref()
            .ok_or_else(|| NodeError::Config("node.uuid is required".into()))?;
        let bytes = hex::decode(hex_uuid)
            .map_err(|e| NodeError::Config(format!("node.uuid is not hex: {e}")))?;
        DeviceUuid::try_from(bytes.as_slice())
            .map_err(|e| NodeError::Config(format!("node.uuid: {e}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Provisioner,
    #[default]
    Device,
}

/// The `[node]` section.
#[derive(Debug, Default, Deserialize)]
pub struct NodeSection {
    #[serde(default)]
    pub role: Role,
    /// 32 hex digits.
    pub uuid: Option<String>,
}

/// The `[bearer]` section; durations in milliseconds.
#[derive(Debug, Deserialize)]
pub struct BearerSection {
    #[serde(default = "default_retransmit_interval_ms")]
    pub retransmit_interval_ms: u64,
    #[serde(default = "default_transaction_timeout_ms")]
    pub transaction_timeout_ms: u64,
    #[serde(default = "default_protocol_timeout_ms")]
    pub protocol_timeout_ms: u64,
    #[serde(default = "default_closing_timeout_ms")]
    pub closing_timeout_ms: u64,
    #[serde(default = "default_rx_capacity")]
    pub rx_capacity: usize,
    #[serde(default = "default_max_tx_segments")]
    pub max_tx_segments: usize,
    #[serde(default = "default_ack_retransmits")]
    pub ack_retransmits: u8,
    #[serde(default = "default_close_retransmits")]
    pub close_retransmits: u8,
}

fn default_retransmit_interval_ms() -> u64 {
    500
}

fn default_transaction_timeout_ms() -> u64 {
    30_000
}

fn default_protocol_timeout_ms() -> u64 {
    60_000
}

fn default_closing_timeout_ms() -> u64 {
    3_000
}

fn default_rx_capacity() -> usize {
    DEFAULT_RX_CAPACITY
}

fn default_max_tx_segments() -> usize {
    DEFAULT_MAX_TX_SEGMENTS
}

fn default_ack_retransmits() -> u8 {
    DEFAULT_ACK_RETRANSMITS
}

fn default_close_retransmits() -> u8 {
    DEFAULT_CLOSE_RETRANSMITS
}

impl Default for BearerSection {
    fn default() -> Self {
        Self {
            retransmit_interval_ms: default_retransmit_interval_ms(),
            transaction_timeout_ms: default_transaction_timeout_ms(),
            protocol_timeout_ms: default_protocol_timeout_ms(),
            closing_timeout_ms: default_closing_timeout_ms(),
            rx_capacity: default_rx_capacity(),
            max_tx_segments: default_max_tx_segments(),
            ack_retransmits: default_ack_retransmits(),
            close_retransmits: default_close_retransmits(),
        }
    }
}

impl BearerSection {
    /// Convert to a validated [`BearerConfig`].
    pub fn to_bearer_config(&self) -> Result<BearerConfig, NodeError> {
        let config = BearerConfig {
            retransmit_interval: Duration::from_millis(self.retransmit_interval_ms),
            transaction_timeout: Duration::from_millis(self.transaction_timeout_ms),
            protocol_timeout: Duration::from_millis(self.protocol_timeout_ms),
            closing_timeout: Duration::from_millis(self.closing_timeout_ms),
            rx_capacity: self.rx_capacity,
            max_tx_segments: self.max_tx_segments,
            ack_retransmits: self.ack_retransmits,
            close_retransmits: self.close_retransmits,
        };
        config
            .validate()
            .map_err(|e| NodeError::Config(format!("[bearer]: {e}")))?;
        Ok(config)
    }
}

/// The `[transport]` section: the UDP stand-in for the advertiser.
#[derive(Debug, Deserialize)]
pub struct TransportSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default)]
    pub broadcast: bool,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_bind() -> String {
    "0.0.0.0:4390".to_string()
}

fn default_target() -> String {
    "127.0.0.1:4390".to_string()
}

fn default_interval_ms() -> u64 {
    20
}

fn default_pool_size() -> usize {
    8
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            target: default_target(),
            broadcast: false,
            interval_ms: default_interval_ms(),
            pool_size: default_pool_size(),
        }
    }
}

impl TransportSection {
    pub fn to_udp_config(&self) -> Result<UdpAdvConfig, NodeError> {
        let mut config =
            UdpAdvConfig::unicast(parse_socket_addr(&self.bind)?, parse_socket_addr(&self.target)?);
        config.broadcast = self.broadcast;
        config.interval = Duration::from_millis(self.interval_ms);
        config.pool_size = self.pool_size;
        Ok(config)
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// The `[session]` section.
#[derive(Debug, Deserialize)]
pub struct SessionSection {
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
    /// Hex-encoded provisioning PDUs the provisioner sends, in order.
    #[serde(default)]
    pub payloads: Vec<String>,
}

fn default_open_timeout_ms() -> u64 {
    10_000
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            open_timeout_ms: default_open_timeout_ms(),
            payloads: Vec::new(),
        }
    }
}

impl SessionSection {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn decoded_payloads(&self) -> Result<Vec<Vec<u8>>, NodeError> {
        self.payloads
            .iter()
            .enumerate()
            .map(|(i, payload)| {
                hex::decode(payload)
                    .map_err(|e| NodeError::Config(format!("session.payloads[{i}]: {e}")))
            })
            .collect()
    }
}

pub fn parse_socket_addr(s: &str) -> Result<SocketAddr, NodeError> {
    s.parse()
        .map_err(|e| NodeError::Config(format!("invalid socket address '{s}': {e}")))
}
