//! Error types for the interfaces layer.

use pbadv_protocol::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("interface stopped")]
    Stopped,
    #[error("transmit failed: {0}")]
    TransmitFailed(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<InterfaceError> for TransportError {
    fn from(err: InterfaceError) -> Self {
        match err {
            InterfaceError::Stopped => TransportError::Disabled,
            other => TransportError::Failed(other.to_string()),
        }
    }
}
