//! Generic Provisioning PDU codec.
//!
//! Every advertising frame carries a 6-byte header (link id, transaction id,
//! GPC byte) followed by a format-specific body.

pub mod control;
pub mod gpc;
pub mod wire;
