//! Modem Calculator Constants
//!
//! This module defines the fixed thresholds and lookup tables used by the
//! Pro2/Pro2+ modem calculator. The larger tables (PA ramp, channel-filter
//! coefficients, OOK zero-IF buckets) are hardware-characterization data:
//! they are literal tables by design and are never derived at runtime.

/// Lowest supported crystal frequency (Hz). Outside this range the
/// calculator warns but proceeds with the commanded value.
pub const XTAL_FREQ_MIN_HZ: f64 = 25_000_000.0;

/// Highest supported crystal frequency (Hz).
pub const XTAL_FREQ_MAX_HZ: f64 = 32_000_000.0;

/// Crystal tolerance above this is a fatal configuration error (ppm).
pub const CRYSTAL_TOL_MAX_PPM: f64 = 10_000.0;

/// `max_rb_error` below this fraction selects the tight Rb-error bucket.
pub const RB_ERROR_LOW_LIMIT: f64 = 0.01;

/// `max_rb_error` high bucket boundary (see `CalcInputs::validate`).
pub const RB_ERROR_HIGH_LIMIT: f64 = 0.10;

/// Highest base-chip preamble pattern selector code.
pub const PM_PATTERN_MAX: i32 = 31;

/// Extended preamble pattern codes admitted by the Plus chip only.
pub const PM_PATTERN_PLUS_CODES: [i32; 5] = [100, 110, 120, 150, 1000];

// ----------------------------------------------------------------------------
// Synthesizer
// ----------------------------------------------------------------------------

/// PLL band table: (carrier min Hz, carrier max Hz, output divider, band code).
///
/// `outdiv` is chosen so the VCO stays in range for the commanded carrier;
/// carriers between bands are assigned to the nearest band with a warning.
pub const PLL_BAND_LUT: [(f64, f64, u32, u8); 6] = [
    (850.0e6, 1050.0e6, 4, 0),
    (566.0e6, 700.0e6, 6, 1),
    (425.0e6, 525.0e6, 8, 2),
    (284.0e6, 350.0e6, 12, 3),
    (213.0e6, 262.0e6, 16, 4),
    (142.0e6, 175.0e6, 24, 5),
];

/// Fractional feedback divider resolution (bits).
pub const FBDIV_FRAC_BITS: u32 = 19;

/// Frequency-deviation register width (bits); values saturate, never wrap.
pub const FREQ_DEV_BITS: u32 = 17;

/// TX NCO modulo field width (bits).
pub const TX_NCO_MODULO_BITS: u32 = 26;

/// TX data-rate register width (bits).
pub const TX_DATA_RATE_BITS: u32 = 24;

/// TX symbol-rate boundary above which no TX oversampling is applied (sps).
pub const TXOSR_X1_THRESHOLD_SPS: f64 = 200_000.0;

/// TX symbol-rate boundary at or below which x4 oversampling is applied (sps).
pub const TXOSR_X4_THRESHOLD_SPS: f64 = 25_000.0;

// ----------------------------------------------------------------------------
// PA ramp
// ----------------------------------------------------------------------------

/// Pro2+ measured PA ramp-up time vs. trim code, in 100 ns units.
///
/// 32-entry characterization table from lab measurement; monotone in the trim
/// code but deliberately non-uniform (the ramp DAC steps are not linear).
pub const PA_RAMP_TIME_LUT: [u16; 32] = [
    2, 3, 4, 5, 6, 8, 10, 12, 14, 17, 20, 24, 28, 33, 39, 46, 54, 63, 74, 87,
    102, 119, 139, 163, 191, 223, 261, 305, 357, 418, 489, 572,
];

/// Per-modulation-type digital path delay estimate, in 100 ns units,
/// indexed by the raw modulation code (carrier, OOK, 2FSK, 2GFSK, 4FSK, 4GFSK).
pub const PA_DIGITAL_DELAY: [u16; 6] = [4, 6, 10, 12, 10, 12];

/// Largest usable PA ramp control index.
pub const PA_RAMP_INDEX_MAX: u8 = 15;

// ----------------------------------------------------------------------------
// RX channel filter / decimation
// ----------------------------------------------------------------------------

/// RX ADC sample rate is the crystal divided by this.
pub const ADC_CLOCK_DIV: f64 = 2.0;

/// Largest total CIC decimation exponent (2^9 = 512).
pub const NDEC_LOG2_MAX: i32 = 9;

/// Nominal channel-rate oversampling target used to size the decimation chain.
pub const CH_OSR_TARGET: f64 = 8.0;

/// Channel-filter coefficient-set bandwidth factors, as a fraction of the
/// channel sample rate, narrowest to widest. Characterized filter bank data.
pub const CHFLT_FACTORS: [f64; 15] = [
    0.148, 0.162, 0.177, 0.193, 0.211, 0.231, 0.252, 0.275, 0.301, 0.329,
    0.359, 0.392, 0.428, 0.468, 0.494,
];

/// Filter chain rows indexed by total decimation exponent:
/// (pre-decimation value, base filter index).
pub const FILTER_CHAIN_LUT: [(u8, u8); 10] = [
    (1, 2),
    (1, 2),
    (1, 1),
    (2, 1),
    (2, 0),
    (4, 0),
    (4, 0),
    (8, 0),
    (8, 0),
    (8, 0),
];

// ----------------------------------------------------------------------------
// BCR
// ----------------------------------------------------------------------------

/// BCR OSR register fraction bits (12-bit value, 3 fractional bits).
pub const BCR_OSR_FRAC_BITS: u32 = 3;

/// Largest encodable BCR OSR register value (511.875 in 9.3 fixed point).
pub const BCR_OSR_MAX: u32 = 0xFFF;

/// OSR below this is allowed but flagged with a warning.
pub const BCR_OSR_MIN: f64 = 7.0;

// ----------------------------------------------------------------------------
// AFC
// ----------------------------------------------------------------------------

/// Empirical AFC loop scale factor (hardware characterization, see DESIGN.md).
pub const AFC_FACTOR: f64 = 0.1;

/// AFC gain saturation range.
pub const AFC_GAIN_MIN: u32 = 1;
pub const AFC_GAIN_MAX: u32 = 4095;

/// AFC limiter values at or above 2^14 switch to the coarse 8:1 encoding.
pub const AFC_LIMITER_COARSE_THRESHOLD: u32 = 1 << 14;

// ----------------------------------------------------------------------------
// OOK
// ----------------------------------------------------------------------------

/// OOK zero-IF override buckets: (max symbol rate sps, synthetic deviation
/// Hz, NCO data-rate multiplier replacing the 10x base rate). Symbol rates
/// above the last bucket use the `OOK_ZERO_IF_*_FALLBACK` pair.
pub const OOK_ZERO_IF_LUT: [(f64, f64, f64); 3] = [
    (5_000.0, 300_000.0, 64.0),
    (40_000.0, 200_000.0, 32.0),
    (100_000.0, 100_000.0, 16.0),
];

/// Zero-IF OOK deviation for symbol rates above 100 ksps.
pub const OOK_ZERO_IF_FDEV_FALLBACK_HZ: f64 = 50_000.0;

/// Zero-IF OOK NCO data-rate multiplier for symbol rates above 100 ksps.
pub const OOK_ZERO_IF_RATE_MULT_FALLBACK: f64 = 12.0;
