//! # Modulator Core
//!
//! TX-side derivation: PLL divider ratios, TX data rate, frequency-deviation
//! word, DSM ratio and PA ramp timing, all from the validated inputs.
//!
//! The modulator never fails and never warns: chip register widths are fixed,
//! so every out-of-range intermediate saturates to the nearest representable
//! value. Step order matters; later steps consume earlier fields.

use serde::{Deserialize, Serialize};

use crate::constants::*;

use super::inputs::{CalcInputs, ModulationType};
use super::ChipKind;

/// Derived TX-side fields, one instance per calculation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulatorFields {
    /// PLL output divider.
    pub outdiv: u32,
    /// Synthesizer band code matching `outdiv`.
    pub band: u8,
    /// Feedback divider integer part.
    pub fc_inte: u32,
    /// Feedback divider fractional part, 19-bit resolution (held in
    /// [2^19, 2^20) so the dithered fraction never crosses an integer edge).
    pub fc_frac: u32,
    /// TX VCO calibration count.
    pub vco_cali_count_tx: u32,
    /// DSM frequency resolution, Hz per LSB.
    pub dsm_ratio: f64,
    /// Frequency-deviation word, 17-bit unsigned.
    pub freq_dev: u32,
    /// TX NCO data-rate register, 24-bit.
    pub tx_data_rate: u32,
    /// Packed TX NCO mode word: 26-bit NCO modulo, oversample code, Manchester.
    pub tx_nco_mode: u32,
    /// TX oversample code: 0 = x1, 1 = x2, 2 = x4.
    pub txosr: u8,
    /// PA ramp time constant (base chip derivation).
    pub pa_tc: u8,
    /// PA ramp step index (Plus chip derivation).
    pub pa_ramp: u8,
    /// Set when the OOK zero-IF deviation/data-rate override is active.
    pub ook_zero_if: u8,
}

/// Derives the modulator fields from validated inputs.
pub fn derive(inputs: &CalcInputs, chip: ChipKind) -> ModulatorFields {
    let modulation = inputs.modulation();

    // 1. Raw deviation programmed into the synthesizer. 4-level FSK commands
    // the outer symbol deviation; the register takes the inner.
    let mut df = match modulation {
        ModulationType::Carrier | ModulationType::Ook => 0.0,
        m if m.is_four_level() => inputs.fdev / 3.0,
        _ => inputs.fdev,
    };

    // 2. Synthesizer divider chain.
    let (outdiv, band) = pll_band(inputs.freq_rf);
    let fbdiv = inputs.freq_rf * outdiv as f64 / (2.0 * inputs.freq_xo);
    let fc_inte = (fbdiv.floor() as u32).saturating_sub(1).min(0xFF);
    let frac_scale = (1u32 << FBDIV_FRAC_BITS) as f64;
    let fc_frac = (((fbdiv - fc_inte as f64) * frac_scale).round() as u32)
        .min((1 << (FBDIV_FRAC_BITS + 1)) - 1);
    let fvco = inputs.freq_rf * outdiv as f64 / 2.0;
    let vco_cali_count_tx = ((fvco / inputs.freq_xo * 64.0).round() as u32).min(0xFFFF);

    // 3. PA ramp timing.
    let (pa_tc, pa_ramp) = match chip {
        ChipKind::Pro2 => (pa_tc_base(inputs.symbol_rate, modulation), 0),
        ChipKind::Pro2Plus => (0, pa_ramp_plus(inputs)),
    };

    // 4. TX oversampling. Rev A/B silicon and OOK run the NCO at the base
    // 10x rate only.
    let txosr = if inputs.chip_version < 2 || modulation.is_ook() {
        0
    } else if inputs.symbol_rate > TXOSR_X1_THRESHOLD_SPS {
        0
    } else if inputs.symbol_rate > TXOSR_X4_THRESHOLD_SPS {
        1
    } else {
        2
    };
    let osr_mult = 1u32 << txosr;

    // 5. DSM resolution.
    let dsm_shift = if inputs.hi_pfm_div_mode == 1 { 17 } else { 18 };
    let dsm_ratio = inputs.freq_xo / ((1u64 << dsm_shift) as f64 * outdiv as f64);

    // 8 (ordered here so step 6 sees the overrides). OOK zero-IF runs the
    // synthesizer with a synthetic deviation and a bucket-specific NCO rate
    // multiplier, both picked by symbol rate.
    let mut ook_zero_if = 0;
    let mut rate_mult = 10.0 * osr_mult as f64;
    if modulation.is_ook() && inputs.if_mode == 0 {
        ook_zero_if = 1;
        let (fdev, mult) = ook_zero_if_override(inputs.symbol_rate);
        df = fdev;
        rate_mult = mult;
    }

    // 6. Deviation word, saturating at the 17-bit register ceiling.
    let freq_dev = ((df / dsm_ratio).round() as u64).min((1 << FREQ_DEV_BITS) - 1) as u32;

    // TX data rate: 10x base NCO rate times the oversample multiplier, unless
    // the zero-IF override replaced the multiplier.
    let tx_data_rate = ((inputs.symbol_rate * rate_mult).round() as u64)
        .min((1 << TX_DATA_RATE_BITS) - 1) as u32;

    // 7. NCO mode word: 26-bit modulo plus the encoding/oversample flags.
    let nco_modulo = (inputs.freq_xo.round() as u32) & ((1 << TX_NCO_MODULO_BITS) - 1);
    let tx_nco_mode =
        nco_modulo | ((txosr as u32) << TX_NCO_MODULO_BITS) | ((inputs.manchester as u32) << 31);

    ModulatorFields {
        outdiv,
        band,
        fc_inte,
        fc_frac,
        vco_cali_count_tx,
        dsm_ratio,
        freq_dev,
        tx_data_rate,
        tx_nco_mode,
        txosr,
        pa_tc,
        pa_ramp,
        ook_zero_if,
    }
}

/// Selects the PLL output divider and band code for a carrier frequency.
/// Carriers between bands take the nearest band.
fn pll_band(freq_rf: f64) -> (u32, u8) {
    for &(min, max, outdiv, band) in &PLL_BAND_LUT {
        if (min..=max).contains(&freq_rf) {
            return (outdiv, band);
        }
    }
    let mut best = (PLL_BAND_LUT[0].2, PLL_BAND_LUT[0].3);
    let mut best_dist = f64::INFINITY;
    for &(min, max, outdiv, band) in &PLL_BAND_LUT {
        let dist = if freq_rf < min {
            min - freq_rf
        } else {
            freq_rf - max
        };
        if dist < best_dist {
            best_dist = dist;
            best = (outdiv, band);
        }
    }
    best
}

/// Base-chip PA ramp time constant, piecewise in symbol rate and modulation.
fn pa_tc_base(symbol_rate: f64, modulation: ModulationType) -> u8 {
    match modulation {
        ModulationType::Carrier => 0x1F,
        // OOK ramps slowly to limit spectral splatter on the key edges.
        ModulationType::Ook => 0x10,
        _ => {
            if symbol_rate >= 200_000.0 {
                0x1F
            } else if symbol_rate >= 100_000.0 {
                0x1C
            } else if symbol_rate >= 25_000.0 {
                0x18
            } else {
                0x14
            }
        }
    }
}

/// Plus-chip PA ramp index from the measured ramp-time LUT.
///
/// The ramp must finish inside a quarter symbol after the digital path delay,
/// with a floor of one ramp unit and a ceiling at index 15.
fn pa_ramp_plus(inputs: &CalcInputs) -> u8 {
    let trim = inputs.pa_ramp_trim.min(31) as usize;
    let ramp_unit = PA_RAMP_TIME_LUT[trim].max(1) as u32;
    let delay = PA_DIGITAL_DELAY[inputs.modulation_type.min(5) as usize] as u32;
    // Quarter-symbol budget in 100 ns units.
    let budget = (2.5e6 / inputs.symbol_rate).round() as u32;
    let idx = budget.saturating_sub(delay) / ramp_unit;
    idx.clamp(1, PA_RAMP_INDEX_MAX as u32) as u8
}

/// Zero-IF OOK synthetic deviation and NCO rate multiplier by symbol-rate
/// bucket.
fn ook_zero_if_override(symbol_rate: f64) -> (f64, f64) {
    for &(max_rb, fdev, rate_mult) in &OOK_ZERO_IF_LUT {
        if symbol_rate <= max_rb {
            return (fdev, rate_mult);
        }
    }
    (OOK_ZERO_IF_FDEV_FALLBACK_HZ, OOK_ZERO_IF_RATE_MULT_FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> CalcInputs {
        CalcInputs {
            freq_xo: 26.0e6,
            freq_rf: 915.0e6,
            symbol_rate: 100_000.0,
            fdev: 50_000.0,
            modulation_type: 3,
            ..CalcInputs::default()
        }
    }

    /// 915 MHz lands in the 850-1050 MHz band with outdiv 4.
    #[test]
    fn band_lookup_915() {
        assert_eq!(pll_band(915.0e6), (4, 0));
    }

    /// A carrier between two bands snaps to the nearest one.
    #[test]
    fn band_lookup_between_bands() {
        // 550 MHz sits between the 425-525 and 566-700 bands, nearer 566.
        assert_eq!(pll_band(550.0e6), (6, 1));
    }

    /// fc_frac stays inside [2^19, 2^20) so dithering never wraps fc_inte.
    #[test]
    fn fbdiv_fraction_range() {
        for rf in [850.0e6, 915.0e6, 921.3e6, 1049.0e6] {
            let mut i = inputs();
            i.freq_rf = rf;
            let m = derive(&i, ChipKind::Pro2);
            assert!(m.fc_frac >= 1 << 19, "fc_frac {} at {} Hz", m.fc_frac, rf);
            assert!(m.fc_frac < 1 << 20, "fc_frac {} at {} Hz", m.fc_frac, rf);
        }
    }

    /// Deviation word saturates at the 17-bit ceiling instead of wrapping.
    #[test]
    fn freq_dev_saturates() {
        let mut i = inputs();
        i.fdev = 50.0e6;
        let m = derive(&i, ChipKind::Pro2);
        assert_eq!(m.freq_dev, (1 << 17) - 1);
    }

    /// TX oversample selection by symbol-rate threshold.
    #[test]
    fn txosr_thresholds() {
        let mut i = inputs();
        i.symbol_rate = 500_000.0;
        assert_eq!(derive(&i, ChipKind::Pro2).txosr, 0);
        i.symbol_rate = 100_000.0;
        assert_eq!(derive(&i, ChipKind::Pro2).txosr, 1);
        i.symbol_rate = 9_600.0;
        assert_eq!(derive(&i, ChipKind::Pro2).txosr, 2);
    }

    /// Rev A/B silicon never oversamples.
    #[test]
    fn txosr_disabled_on_old_silicon() {
        let mut i = inputs();
        i.chip_version = 1;
        i.symbol_rate = 9_600.0;
        assert_eq!(derive(&i, ChipKind::Pro2).txosr, 0);
    }

    /// DSM ratio follows the high PFM divide mode flag (2^17 vs 2^18).
    #[test]
    fn dsm_ratio_pfm_mode() {
        let mut i = inputs();
        let normal = derive(&i, ChipKind::Pro2).dsm_ratio;
        i.hi_pfm_div_mode = 1;
        let high = derive(&i, ChipKind::Pro2).dsm_ratio;
        assert!((high / normal - 2.0).abs() < 1e-12);
    }

    /// OOK zero-IF picks the synthetic deviation and the rate multiplier by
    /// symbol-rate bucket.
    #[test]
    fn ook_zero_if_buckets() {
        assert_eq!(ook_zero_if_override(4_800.0), (300_000.0, 64.0));
        assert_eq!(ook_zero_if_override(38_400.0), (200_000.0, 32.0));
        assert_eq!(ook_zero_if_override(100_000.0), (100_000.0, 16.0));
        assert_eq!(ook_zero_if_override(250_000.0), (50_000.0, 12.0));
    }

    /// Zero-IF OOK replaces the 10x NCO data rate with the bucket multiplier;
    /// a scaled-IF run of the same inputs keeps the base rate.
    #[test]
    fn ook_zero_if_overrides_data_rate() {
        let mut i = inputs();
        i.modulation_type = 1;
        i.symbol_rate = 4_800.0;
        i.if_mode = 0;
        let zero_if = derive(&i, ChipKind::Pro2);
        assert_eq!(zero_if.ook_zero_if, 1);
        assert_eq!(zero_if.tx_data_rate, 4_800 * 64);

        i.if_mode = 2;
        let scaled_if = derive(&i, ChipKind::Pro2);
        assert_eq!(scaled_if.tx_data_rate, 4_800 * 10);
        assert_ne!(zero_if.tx_data_rate, scaled_if.tx_data_rate);
    }

    /// Out-of-band carriers saturate the feedback-divider integer at its
    /// register width instead of overflowing the byte.
    #[test]
    fn fbdiv_integer_saturates() {
        let mut i = inputs();
        i.freq_rf = 5.0e9;
        let m = derive(&i, ChipKind::Pro2);
        assert_eq!(m.fc_inte, 0xFF);
    }
}
