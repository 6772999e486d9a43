//! # pro2calc - Modem Parameter Calculator for Pro2/Pro2+ Transceivers
//!
//! The pro2calc crate converts high-level sub-GHz radio configuration
//! (crystal frequency, symbol rate, frequency deviation, crystal tolerance,
//! modulation type, AFC/antenna-diversity/DSA options) into the exact
//! register bitfield values the Pro2/Pro2+ digital modem expects.
//!
//! ## Features
//!
//! - Validate symbolic radio inputs with a clamp-and-warn policy
//! - Derive the TX parameters: PLL dividers, deviation word, NCO data rate,
//!   DSM ratio, PA ramp timing
//! - Derive the RX parameters: decimation chain, channel filter, BCR and AFC
//!   loop settings, preamble detector selection
//! - Pack both field sets into a named, byte-level register image
//! - Parse the legacy matlab-style test-plan file format
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```rust
//! use pro2calc::{CalcInputs, ChipKind, ModemCalc};
//!
//! let inputs = CalcInputs {
//!     freq_xo: 26.0e6,
//!     freq_rf: 915.0e6,
//!     symbol_rate: 100_000.0,
//!     fdev: 50_000.0,
//!     ..CalcInputs::default()
//! };
//! let mut calc = ModemCalc::new(inputs, ChipKind::Pro2);
//! calc.calculate().expect("feasible configuration");
//! let dr = calc.registers().get("MODEM_DATA_RATE_2").unwrap();
//! # let _ = dr;
//! ```

pub mod calc;
pub mod constants;
pub mod error;
pub mod factory;
pub mod logging;

pub use crate::error::CalcError;
pub use crate::logging::{init_logger, log_info, CalcLog};

// Core calculator types
pub use calc::demodulator::DemodFields;
pub use calc::inputs::{CalcInputs, ModulationType};
pub use calc::modulator::ModulatorFields;
pub use calc::registers::RegisterMap;
pub use calc::{CalcData, ChipKind, ModemCalc};

// Test-plan file entry point
pub use factory::from_file;
