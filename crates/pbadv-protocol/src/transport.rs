//! Seams to the advertising transport and the crypto module.
//!
//! Transmission is two-phase: [`AdvTransport::transmit`] queues a frame and
//! returns a [`FrameToken`]; the driver later reports the outcome through
//! [`PbAdvBearer::on_transmit_complete`](crate::PbAdvBearer::on_transmit_complete).

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::TransportError;

/// Handle for one queued frame, unique for the lifetime of a transport.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(u64);

impl FrameToken {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for FrameToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameToken({})", self.0)
    }
}

impl fmt::Display for FrameToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Connectionless broadcast transport underneath the bearer.
pub trait AdvTransport {
    /// Make sure the advertiser is running. Called on every open and accept.
    fn enable(&mut self) -> Result<(), TransportError>;

    /// Queue `frame` for broadcast, repeated `retransmits` extra times.
    fn transmit(&mut self, frame: &[u8], retransmits: u8) -> Result<FrameToken, TransportError>;
}

/// Crypto services the bearer needs.
pub trait ProvCrypto {
    /// Frame check sequence over a complete provisioning PDU.
    fn fcs(&self, data: &[u8]) -> u8;

    /// Whether `fcs` is the frame check sequence received with `data`.
    fn fcs_check(&self, data: &[u8], fcs: u8) -> bool {
        self.fcs(data) == fcs
    }

    fn random_u32(&mut self) -> u32;
}

/// [`ProvCrypto`] backed by `pbadv-crypto` and a `rand` generator.
#[derive(Debug, Clone)]
pub struct MeshCrypto<R = OsRng> {
    rng: R,
}

impl MeshCrypto<OsRng> {
    pub fn new() -> Self {
        Self { rng: OsRng }
    }
}

impl Default for MeshCrypto<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> MeshCrypto<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore> ProvCrypto for MeshCrypto<R> {
    fn fcs(&self, data: &[u8]) -> u8 {
        pbadv_crypto::fcs_calc(data)
    }

    fn fcs_check(&self, data: &[u8], fcs: u8) -> bool {
        pbadv_crypto::fcs_check(data, fcs)
    }

    fn random_u32(&mut self) -> u32 {
        pbadv_crypto::rng::random_u32_from(&mut self.rng)
    }
}
