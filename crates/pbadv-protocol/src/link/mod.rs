//! Link controller state.
//!
//! One [`Link`](state::Link) exists per bearer. It moves
//! `Idle -> Opening -> Active -> Closing -> Idle` on the provisioner and
//! `Idle -> Active -> Closing -> Idle` on the device.

pub mod state;
pub mod types;
