//! Bearer timing and capacity configuration.

use std::time::Duration;

use pbadv_core::constants::max_pdu_len;

use crate::error::BearerError;
use crate::transaction::segments::SegmentSet;

pub const DEFAULT_RETRANSMIT_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROTOCOL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CLOSING_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_RX_CAPACITY: usize = 65;
pub const DEFAULT_MAX_TX_SEGMENTS: usize = 3;
pub const DEFAULT_ACK_RETRANSMITS: u8 = 2;
pub const DEFAULT_CLOSE_RETRANSMITS: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerConfig {
    /// Interval between resubmissions of unacknowledged segments.
    pub retransmit_interval: Duration,
    /// How long a data transaction is retried before it is abandoned.
    pub transaction_timeout: Duration,
    /// Link inactivity timeout; refreshed by every sent or received message.
    pub protocol_timeout: Duration,
    /// Upper bound on the Closing state when the close frame never completes.
    pub closing_timeout: Duration,
    /// Largest inbound PDU the reassembly buffer holds.
    pub rx_capacity: usize,
    /// Largest number of frames one outbound message may occupy.
    pub max_tx_segments: usize,
    pub ack_retransmits: u8,
    pub close_retransmits: u8,
}

impl Default for BearerConfig {
    fn default() -> Self {
        Self {
            retransmit_interval: DEFAULT_RETRANSMIT_INTERVAL,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
            protocol_timeout: DEFAULT_PROTOCOL_TIMEOUT,
            closing_timeout: DEFAULT_CLOSING_TIMEOUT,
            rx_capacity: DEFAULT_RX_CAPACITY,
            max_tx_segments: DEFAULT_MAX_TX_SEGMENTS,
            ack_retransmits: DEFAULT_ACK_RETRANSMITS,
            close_retransmits: DEFAULT_CLOSE_RETRANSMITS,
        }
    }
}

impl BearerConfig {
    pub fn validate(&self) -> Result<(), BearerError> {
        let durations = [
            ("retransmit_interval", self.retransmit_interval),
            ("transaction_timeout", self.transaction_timeout),
            ("protocol_timeout", self.protocol_timeout),
            ("closing_timeout", self.closing_timeout),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(BearerError::InvalidConfig(format!("{name} must be non-zero")));
            }
        }

        if self.max_tx_segments == 0 || self.max_tx_segments > SegmentSet::MAX_SEGMENTS {
            return Err(BearerError::InvalidConfig(format!(
                "max_tx_segments must be within 1..={}, got {}",
                SegmentSet::MAX_SEGMENTS,
                self.max_tx_segments
            )));
        }

        let rx_limit = max_pdu_len(SegmentSet::MAX_SEGMENTS);
        if self.rx_capacity == 0 || self.rx_capacity > rx_limit {
            return Err(BearerError::InvalidConfig(format!(
                "rx_capacity must be within 1..={rx_limit}, got {}",
                self.rx_capacity
            )));
        }

        Ok(())
    }
}
