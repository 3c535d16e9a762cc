//! Random link identifiers.

use rand::RngCore;

/// Draw a random 32-bit value from a caller-supplied generator.
///
/// Tests pass a seeded `StdRng` here to get reproducible link identifiers.
#[must_use]
pub fn random_u32_from<R: RngCore + ?Sized>(rng: &mut R) -> u32 {
    rng.next_u32()
}
