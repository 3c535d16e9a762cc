//! Advertising transports for the provisioning bearer.
//!
//! The bearer itself is synchronous; this crate bridges its
//! [`AdvTransport`](pbadv_protocol::AdvTransport) seam to tokio. A
//! [`ChannelTransport`] queues frames for an advertiser task which repeats
//! each frame on a [`Radio`] and reports the completion back, mimicking an
//! advertising controller with a fixed pool of frame buffers.

pub mod error;
pub mod memory;
pub mod port;
pub mod shutdown;
pub mod udp;

pub use error::InterfaceError;
pub use memory::{Delivery, MemoryMedium};
pub use port::{AdvPort, ChannelTransport, Completion, OutboundFrame, Radio, run_advertiser};
pub use shutdown::ShutdownToken;
pub use udp::{UdpAdvConfig, UdpAdvertiser};
