//! Protocol state machines for the advertising provisioning bearer.
//!
//! The bearer is sans-I/O: it never sleeps, spawns or touches a socket.
//! Callers hand it inbound frames, transport completions and the current
//! time, and drain [`BearerEvent`]s from it. Outbound frames go through the
//! [`AdvTransport`] seam.

pub mod bearer;
pub mod config;
pub mod error;
pub mod link;
pub mod testing;
pub mod timer;
pub mod transaction;
pub mod transport;

pub use bearer::PbAdvBearer;
pub use bearer::events::{BearerEvent, SendOutcome};
pub use config::BearerConfig;
pub use error::{BearerError, TransportError};
pub use link::types::{LinkRole, LinkState, ProvError, Registration};
pub use transport::{AdvTransport, FrameToken, MeshCrypto, ProvCrypto};
