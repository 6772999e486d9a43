//! # Calculator Inputs
//!
//! `CalcInputs` is the flat bag of symbolic radio parameters the calculator
//! consumes. It is constructed once (from defaults, the test-plan file parser
//! or field-by-field), then validated in place exactly once before any
//! derivation runs. Validation clamps out-of-range values and records every
//! clamp as a human-readable warning; only a small set of physically
//! infeasible combinations is fatal (see [`CalcError`]).

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::CalcError;

use super::ChipKind;

/// Modulation scheme selected by the raw `modulation_type` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModulationType {
    Carrier,
    Ook,
    Fsk2,
    Gfsk2,
    Fsk4,
    Gfsk4,
}

impl ModulationType {
    /// Maps a validated raw code (0..=5) to the enum.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => ModulationType::Carrier,
            1 => ModulationType::Ook,
            2 => ModulationType::Fsk2,
            3 => ModulationType::Gfsk2,
            4 => ModulationType::Fsk4,
            _ => ModulationType::Gfsk4,
        }
    }

    pub fn is_ook(self) -> bool {
        self == ModulationType::Ook
    }

    /// True for the 4-level FSK schemes (commanded deviation is the outer
    /// symbol deviation; the synthesizer word is programmed with the inner).
    pub fn is_four_level(self) -> bool {
        matches!(self, ModulationType::Fsk4 | ModulationType::Gfsk4)
    }

    /// True for any frequency-modulated scheme (2/4-level, shaped or not).
    pub fn is_fsk_family(self) -> bool {
        !matches!(self, ModulationType::Carrier | ModulationType::Ook)
    }
}

/// High-level radio configuration for one calculation run.
///
/// Boolean-like options are carried as 0/1 integers to stay byte-compatible
/// with the test-plan file format; validation canonicalizes any truthy value
/// to exactly 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcInputs {
    /// Crystal reference frequency, Hz.
    pub freq_xo: f64,
    /// Carrier (channel center) frequency, Hz.
    pub freq_rf: f64,
    /// Symbol rate, sps.
    pub symbol_rate: f64,
    /// Peak frequency deviation, Hz (outer deviation for 4-level FSK).
    pub fdev: f64,
    /// Commanded RX channel bandwidth, Hz; 0 = derive from modulation.
    pub rx_bandwidth: f64,
    /// Crystal tolerance, ppm (both ends of the link combined).
    pub crystal_tol: f64,
    /// Raw modulation code 0..=5, see [`ModulationType::from_code`].
    pub modulation_type: u8,
    /// Manchester encoding on/off.
    pub manchester: u8,
    /// AFC loop enable.
    pub afc_en: u8,
    /// Antenna diversity enable.
    pub ant_div: u8,
    /// One-shot AFC measurement (Plus only).
    pub one_shot_afc: u8,
    /// RSSI jump detector enable (Plus only).
    pub rssi_jump_en: u8,
    /// DSA mode: 0 off, 1 signal-arrival detect, 2 RX hopping (Plus only).
    pub dsa_mode: u8,
    /// Preamble pattern selector code.
    pub pm_pattern: i32,
    /// Tolerated fractional data-rate error between the two link ends.
    pub max_rb_error: f64,
    /// Internal Rb-error bucket derived from `max_rb_error` by validation.
    pub api_rb_error: u8,
    /// Silicon revision: 0/1 = rev A/B, 2/3 = rev C/C+.
    pub chip_version: u8,
    /// High PFM divide mode (DSM divide 2^17 instead of 2^18).
    pub hi_pfm_div_mode: u8,
    /// Signed RX decimation tuning, in chain steps.
    pub osr_tune: i32,
    /// PA ramp LUT trim code (Plus only).
    pub pa_ramp_trim: u8,
    /// IF placement: 0 zero-IF, 1 fixed-IF, 2 scaled-IF.
    pub if_mode: u8,
}

impl Default for CalcInputs {
    fn default() -> Self {
        CalcInputs {
            freq_xo: 30.0e6,
            freq_rf: 915.0e6,
            symbol_rate: 40_000.0,
            fdev: 20_000.0,
            rx_bandwidth: 0.0,
            crystal_tol: 20.0,
            modulation_type: 3,
            manchester: 0,
            afc_en: 1,
            ant_div: 0,
            one_shot_afc: 0,
            rssi_jump_en: 0,
            dsa_mode: 0,
            pm_pattern: 0,
            max_rb_error: 0.0,
            api_rb_error: 0,
            chip_version: 2,
            hi_pfm_div_mode: 0,
            osr_tune: 0,
            pa_ramp_trim: 16,
            if_mode: 2,
        }
    }
}

impl CalcInputs {
    /// Returns the factory default input set.
    pub fn get_defaults() -> Self {
        CalcInputs::default()
    }

    /// The validated modulation scheme.
    pub fn modulation(&self) -> ModulationType {
        ModulationType::from_code(self.modulation_type)
    }

    /// Validates and canonicalizes the inputs in place.
    ///
    /// Out-of-range values are clamped and each clamp is recorded as a
    /// warning string. Fatal conditions (crystal tolerance above 10000 ppm,
    /// an OOK channel filter narrower than twice the symbol rate) return a
    /// [`CalcError`] instead. Validation is a fixed point: running it again
    /// on already-valid inputs changes nothing and emits no warnings.
    pub fn validate(&mut self, chip: ChipKind) -> Result<Vec<String>, CalcError> {
        let mut warnings = Vec::new();

        if !(XTAL_FREQ_MIN_HZ..=XTAL_FREQ_MAX_HZ).contains(&self.freq_xo) {
            // Out-of-range crystals are unusual but not impossible; proceed
            // with the commanded value.
            warnings.push(format!(
                "crystal frequency {} Hz outside [25 MHz, 32 MHz]",
                self.freq_xo
            ));
        }

        if self.crystal_tol < 0.0 {
            self.crystal_tol = self.crystal_tol.abs();
            warnings.push(format!(
                "crystal tolerance sign ignored, using {} ppm",
                self.crystal_tol
            ));
        }
        if self.crystal_tol > CRYSTAL_TOL_MAX_PPM {
            return Err(CalcError::CrystalToleranceOutOfRange(self.crystal_tol));
        }

        if self.modulation_type > 5 {
            warnings.push(format!(
                "modulation type {} out of range, clamped to 5",
                self.modulation_type
            ));
            self.modulation_type = 5;
        }

        if self.modulation().is_ook()
            && self.rx_bandwidth > 0.0
            && self.rx_bandwidth <= 2.0 * self.symbol_rate
        {
            return Err(CalcError::OokBandwidthTooNarrow {
                bandwidth_hz: self.rx_bandwidth,
                symbol_rate: self.symbol_rate,
            });
        }

        for flag in [
            &mut self.manchester,
            &mut self.afc_en,
            &mut self.ant_div,
            &mut self.one_shot_afc,
            &mut self.rssi_jump_en,
            &mut self.hi_pfm_div_mode,
        ] {
            if *flag > 1 {
                *flag = 1;
            }
        }

        // Tri-state Rb-error bucket. The source carried a third bucket for
        // errors above the 10% high limit ("20% Rb error") that was later
        // disabled; anything at or above the low limit lands in bucket 1.
        self.api_rb_error = if self.max_rb_error < RB_ERROR_LOW_LIMIT {
            0
        } else if self.max_rb_error <= RB_ERROR_HIGH_LIMIT {
            1
        } else {
            1
        };

        let pm_ok = match chip {
            ChipKind::Pro2 => (0..=PM_PATTERN_MAX).contains(&self.pm_pattern),
            ChipKind::Pro2Plus => {
                (0..=PM_PATTERN_MAX).contains(&self.pm_pattern)
                    || PM_PATTERN_PLUS_CODES.contains(&self.pm_pattern)
            }
        };
        if !pm_ok {
            let clamped = self.pm_pattern.clamp(0, PM_PATTERN_MAX);
            warnings.push(format!(
                "preamble pattern {} unknown, clamped to {}",
                self.pm_pattern, clamped
            ));
            self.pm_pattern = clamped;
        }

        if self.chip_version > 3 {
            warnings.push(format!(
                "chip version {} invalid, using 2",
                self.chip_version
            ));
            self.chip_version = 2;
        }

        Ok(warnings)
    }
}
