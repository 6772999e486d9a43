//! # Calculator Error Handling
//!
//! This module defines the CalcError enum, which represents the small set of
//! truly fatal conditions the modem calculator can hit. Everything else the
//! calculator encounters degrades to a logged warning with a clamped or
//! substituted value; only physically infeasible configurations abort the run.

use thiserror::Error;

/// Represents the fatal error types of the pro2calc crate.
#[derive(Debug, Error)]
pub enum CalcError {
    /// Crystal tolerance beyond anything the AFC can be configured for.
    #[error("Crystal tolerance {0} ppm exceeds the 10000 ppm limit")]
    CrystalToleranceOutOfRange(f64),

    /// OOK channel filter cannot be built narrower than twice the symbol rate.
    #[error("OOK RX bandwidth {bandwidth_hz} Hz is infeasible for symbol rate {symbol_rate} sps")]
    OokBandwidthTooNarrow { bandwidth_hz: f64, symbol_rate: f64 },

    /// BCR oversampling ratio does not fit the 12-bit OSR register.
    #[error("BCR OSR register value {0} overflows the 12-bit field")]
    BcrOsrOverflow(u32),

    /// Indicates an error reading or tokenizing a test-plan input file.
    #[error("Error parsing input file: {0}")]
    InputFileError(String),

    /// Test-plan vector length does not match any known schema.
    #[error("Unknown input schema: {0} values (expected 24, 27, 29, 48 or 49)")]
    UnknownInputSchema(usize),
}
