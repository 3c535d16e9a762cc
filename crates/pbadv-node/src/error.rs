//! Error types for the node.

use pbadv_interfaces::InterfaceError;
use pbadv_protocol::BearerError;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("interface error: {0}")]
    Interface(#[from] InterfaceError),
    #[error("bearer error: {0}")]
    Bearer(#[from] BearerError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("advertiser channel closed")]
    TransportClosed,
    #[error("node stopped")]
    Stopped,
}
