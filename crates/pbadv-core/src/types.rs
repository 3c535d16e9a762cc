//! Newtype wrappers for identifiers carried in provisioning frames.

use core::fmt;

use crate::constants::{DEVICE_UUID_SIZE, XACT_ID_MAX};

fn fmt_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes {
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

/// Error returned when a byte slice has the wrong length for a fixed-size type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid length: expected {}, got {}",
            self.expected, self.actual
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidLength {}

/// Random 32-bit identifier of one provisioning link, big-endian on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LinkId(u32);

impl LinkId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub const fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl fmt::Debug for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkId({:08x})", self.0)
    }
}

/// Transaction number of one Generic Provisioning message.
///
/// The low seven bits roll over; bit 7 tells which side allocated the id
/// (clear for the provisioner, set for the device) and survives [`next`].
///
/// [`next`]: TransactionId::next
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u8);

impl TransactionId {
    /// Last-used id of a provisioner before its first message (next is `0x00`).
    pub const PROVISIONER_INITIAL: Self = Self(XACT_ID_MAX);

    /// Last-used id of a device before its first message (next is `0x80`).
    pub const DEVICE_INITIAL: Self = Self(0xFF);

    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Successor id in the same half of the id space.
    #[must_use]
    pub const fn next(self) -> Self {
        Self((self.0.wrapping_add(1) & XACT_ID_MAX) | (self.0 & (XACT_ID_MAX + 1)))
    }

    /// Whether the id belongs to the device half of the id space.
    pub const fn is_device(self) -> bool {
        self.0 & (XACT_ID_MAX + 1) != 0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId(0x{:02x})", self.0)
    }
}

/// 128-bit device UUID advertised by an unprovisioned device.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceUuid([u8; DEVICE_UUID_SIZE]);

impl DeviceUuid {
    pub const fn new(bytes: [u8; DEVICE_UUID_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; DEVICE_UUID_SIZE] {
        &self.0
    }
}

impl AsRef<[u8]> for DeviceUuid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for DeviceUuid {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; DEVICE_UUID_SIZE] = bytes.try_into().map_err(|_| InvalidLength {
            expected: DEVICE_UUID_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for DeviceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl fmt::Debug for DeviceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceUuid(")?;
        fmt_hex(&self.0[..4], f)?;
        write!(f, "..)")
    }
}
