//! Receive and transmit transaction managers.

pub mod rx;
pub mod segments;
pub mod tx;
