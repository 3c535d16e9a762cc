//! Link-level enumerations.

use std::fmt;

use pbadv_core::DeviceUuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Provisioner,
    Device,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Idle,
    Opening,
    Active,
    Closing,
}

impl LinkState {
    pub fn name(&self) -> &'static str {
        match self {
            LinkState::Idle => "idle",
            LinkState::Opening => "opening",
            LinkState::Active => "active",
            LinkState::Closing => "closing",
        }
    }
}

/// Provisioning error reported to the session layer.
///
/// Values are the provisioning protocol's error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProvError {
    InvalidFormat = 0x02,
    UnexpectedPdu = 0x03,
}

impl ProvError {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ProvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvError::InvalidFormat => write!(f, "invalid format"),
            ProvError::UnexpectedPdu => write!(f, "unexpected PDU"),
        }
    }
}

/// Who the bearer currently accepts frames for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Registration {
    /// Frames are ignored.
    #[default]
    None,
    /// Opened a link as provisioner.
    Provisioner,
    /// Waiting for (or serving) a Link Open addressed to this UUID.
    Device(DeviceUuid),
}
