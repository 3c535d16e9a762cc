//! Integrity and randomness primitives for the advertising provisioning bearer.
//!
//! The bearer needs exactly two things from a crypto module: an 8-bit frame
//! check sequence over reassembled provisioning PDUs, and a source of random
//! 32-bit link identifiers.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod fcs;
pub mod rng;

pub use fcs::{fcs_calc, fcs_check};
pub use rng::random_u32_from;
