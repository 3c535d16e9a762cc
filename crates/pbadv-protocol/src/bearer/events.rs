//! Events the bearer reports to the provisioning session.

use pbadv_core::{CloseReason, TransactionId};

use crate::link::types::ProvError;

/// How an outbound message ended. Every accepted send ends exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Acked,
    TimedOut,
    /// Superseded by a new send, cleared, retired by the peer's next
    /// transaction, or dropped with the link.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerEvent {
    LinkOpened,
    LinkClosed(CloseReason),
    MessageReceived(Vec<u8>),
    ProtocolError(ProvError),
    SendComplete {
        xact_id: TransactionId,
        outcome: SendOutcome,
    },
}
