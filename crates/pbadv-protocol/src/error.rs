//! Protocol error types.
//!
//! Peer misbehaviour is never returned from an entry point; it surfaces as a
//! [`BearerEvent::ProtocolError`](crate::BearerEvent::ProtocolError). These
//! errors cover local misuse and transport failures.

use pbadv_core::PduError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("no advertising buffers available")]
    NoBuffers,

    #[error("advertiser disabled")]
    Disabled,

    #[error("transmit failed: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BearerError {
    #[error("link busy")]
    Busy,

    #[error("link not active")]
    LinkNotActive,

    #[error("empty message")]
    EmptyMessage,

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("frame encoding failed: {0}")]
    Encode(#[from] PduError),

    #[error("invalid bearer configuration: {0}")]
    InvalidConfig(String),
}
