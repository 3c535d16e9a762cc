//! Core types, constants, and wire formats for the advertising provisioning bearer.
//!
//! This crate defines the newtype identifiers carried in every frame, the
//! Generic Provisioning Control (GPC) byte, bearer-control messages, and the
//! frame codec that turns 6..=29 byte advertising payloads into typed PDUs.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod constants;
pub mod error;
pub mod pdu;
pub mod types;

pub use constants::{BearerOpcode, CloseReason, Gpcf};
pub use error::PduError;
pub use pdu::control::BearerControl;
pub use pdu::gpc::Gpc;
pub use pdu::wire::{Frame, GenericProv, Pdu};
pub use types::{DeviceUuid, InvalidLength, LinkId, TransactionId};
