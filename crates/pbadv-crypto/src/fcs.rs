//! 8-bit Frame Check Sequence.
//!
//! The FCS is the CRC defined by 3GPP TS 27.010: reflected polynomial
//! `x^8 + x^2 + x + 1` (`0xE0` in LSB-first form), initial value `0xFF`,
//! transmitted as the ones-complement of the register. Running the receiver
//! over `data || fcs` leaves the fixed residual [`FCS_RESIDUAL`].

/// Register value left after feeding a message followed by its valid FCS.
pub const FCS_RESIDUAL: u8 = 0xCF;

const FCS_INIT: u8 = 0xFF;

const FCS_POLY_REFLECTED: u8 = 0xE0;

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x01 != 0 {
                (crc >> 1) ^ FCS_POLY_REFLECTED
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static FCS_TABLE: [u8; 256] = build_table();

fn run(init: u8, data: &[u8]) -> u8 {
    data.iter()
        .fold(init, |fcs, byte| FCS_TABLE[(fcs ^ byte) as usize])
}

/// Compute the FCS of `data`.
#[must_use]
pub fn fcs_calc(data: &[u8]) -> u8 {
    0xFF - run(FCS_INIT, data)
}

/// Verify `data` against a received FCS value.
#[must_use]
pub fn fcs_check(data: &[u8], received_fcs: u8) -> bool {
    let fcs = run(FCS_INIT, data);
    FCS_TABLE[(fcs ^ received_fcs) as usize] == FCS_RESIDUAL
}
