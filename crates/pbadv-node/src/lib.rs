//! Provisioning node: configuration, logging and the async driver that runs
//! a bearer session over an advertising transport.

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod session;

pub use config::{NodeConfig, Role};
pub use error::NodeError;
pub use node::{Node, ShutdownHandle};
pub use session::{Session, SessionReport};
