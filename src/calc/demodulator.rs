//! # Demodulator Core
//!
//! RX-side derivation: channel filter and decimation, BCR (bit/clock
//! recovery) OSR and loop gains, AFC gain/limiter with saturation handling,
//! RSSI / antenna-diversity / DSA gear configuration and preamble detector
//! selection.
//!
//! The derivation is a strictly ordered pipeline of 23 numbered steps. Step N
//! may read any field written by a step before it, so the call order in
//! [`derive`] is a hard invariant; each step function takes only the upstream
//! fields it actually needs. One path is fatal (BCR OSR register overflow);
//! every other out-of-range condition degrades to a logged warning and a
//! best-effort clamped value.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::CalcError;

use super::filter_chain::FilterChainLu;
use super::inputs::{CalcInputs, ModulationType};
use super::modulator::ModulatorFields;
use super::ChipKind;

/// Peak preamble detector.
pub const DETECTOR_PEAK: u8 = 0;
/// Moving-average preamble detector.
pub const DETECTOR_MOVING_AVG: u8 = 1;
/// Min-max preamble detector.
pub const DETECTOR_MIN_MAX: u8 = 2;

/// Derived RX-side fields, one instance per calculation run.
///
/// `bw_mod` and `ch_fil_bw` are scratch intermediates kept for inspection;
/// they are not packed into any register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DemodFields {
    // Scratch (non-register) intermediates.
    pub bw_mod: f64,
    pub ch_fil_bw: f64,
    pub fs_rx_ch: f64,
    pub osr: f64,

    // Decimation chain.
    pub ndec0: u8,
    pub ndec1: u8,
    pub ndec2: u8,
    pub ndec_pre: u8,
    pub base_fil_idx: u8,
    pub osr_tune_applied: i32,

    // Channel filter coefficient-set indices.
    pub filter_k1: u8,
    pub filter_k2: u8,

    // Bit/clock recovery.
    pub bcr_osr: u32,
    pub bcr_nco_offset: u32,
    pub bcr_gain: u32,
    pub bcr_gear: u8,

    // Preamble detector cluster.
    pub detector: u8,
    pub pm_thresh: u8,
    pub skipsyn: u8,
    pub pm_gear_sw: u8,
    pub afc_pm_timeout: u8,

    // IF placement.
    pub if_freq_hz: f64,
    pub if_freq_count: i32,
    pub zero_if: u8,

    // Raw-eye / MA filter gain.
    pub rawflt_gain: u8,
    pub raw_eye: u32,

    // AFC loop.
    pub afc_gain: u32,
    pub afc_gain_ovf: u8,
    pub afc_limiter: u32,
    pub afc_fast_gear: u8,
    pub afc_slow_gear: u8,
    pub afc_gear_sw: u8,

    // OOK detector.
    pub ook_attack: u8,
    pub ook_decay: u8,
    pub ook_squelch: u8,

    // Sync word detection.
    pub sync_thresh: u8,

    // RSSI.
    pub rssi_latch: u8,
    pub rssi_comp: u8,
    pub rssi_thresh: u8,

    // Antenna diversity.
    pub ant_div_mode: u8,
    pub ant2pm_thd: u8,

    // Signal-arrival / RX hopping (Plus).
    pub dsa_en: u8,
    pub dsa_ctrl1: u8,
    pub dsa_ctrl2: u8,
    pub spike_det: u8,

    // One-shot AFC (Plus).
    pub oneshot_afc: u8,
    pub afc_est_window: u8,

    // RSSI jump detection (Plus).
    pub rssi_jump_en: u8,
    pub rssi_jump_thresh: u8,

    // RX VCO calibration.
    pub vco_cali_count_rx: u32,

    // AGC.
    pub agc_window: u8,
    pub agc_rfpd_decay: u8,
    pub agc_ifpd_decay: u8,
    pub agc_ovr: u16,

    // Final detector thresholds.
    pub eye_open_thd: u8,
    pub ma_decay: u8,
}

/// Derives the demodulator fields. `modulator` must already be populated.
pub fn derive(
    inputs: &CalcInputs,
    modulator: &ModulatorFields,
    chain: &FilterChainLu,
    chip: ChipKind,
    warnings: &mut Vec<String>,
) -> Result<DemodFields, CalcError> {
    let mut f = DemodFields::default();

    step_01_bandwidths(&mut f, inputs);
    step_02_decimation(&mut f, inputs, chain, warnings);
    step_03_channel_filter(&mut f, inputs, warnings);
    step_04_bcr_osr(&mut f, inputs, warnings)?;
    step_05_bcr_nco(&mut f);
    step_06_bcr_gain(&mut f);
    step_07_preamble_pattern(&mut f, inputs, chip);
    step_08_if_freq(&mut f, inputs, modulator.outdiv);
    step_09_raw_eye(&mut f, modulator, inputs);
    step_10_afc_gain(&mut f, inputs, modulator.dsm_ratio);
    step_11_afc_limiter(&mut f, inputs, modulator.dsm_ratio);
    step_12_afc_gears(&mut f, inputs);
    step_13_bcr_gears(&mut f, inputs);
    step_14_ook_detector(&mut f, inputs);
    step_15_sync_config(&mut f);
    step_16_rssi(&mut f);
    step_17_antenna_diversity(&mut f, inputs);
    step_18_dsa(&mut f, inputs, chip, warnings);
    step_19_one_shot_afc(&mut f, inputs, chip);
    step_20_rssi_jump(&mut f, inputs, chip);
    step_21_vco_count_rx(&mut f, modulator.outdiv, modulator.vco_cali_count_tx, inputs.freq_xo);
    step_22_agc(&mut f);
    step_23_finalize(&mut f);

    Ok(f)
}

/// Step 1: modulation bandwidth and channel-filter bandwidth targets.
fn step_01_bandwidths(f: &mut DemodFields, inputs: &CalcInputs) {
    let chip_rate = inputs.symbol_rate * (1 + inputs.manchester) as f64;
    f.bw_mod = match inputs.modulation() {
        ModulationType::Carrier => {
            (2.0 * inputs.freq_rf * inputs.crystal_tol * 1e-6).max(1_000.0)
        }
        ModulationType::Ook => 4.0 * chip_rate,
        // Carson bandwidth; 4-level commands the outer deviation already.
        _ => 2.0 * inputs.fdev + chip_rate,
    };
    f.ch_fil_bw = if inputs.rx_bandwidth > 0.0 {
        inputs.rx_bandwidth
    } else {
        f.bw_mod
    };
}

/// Step 2: apply the OSR tune steps to the chain and split the decimation
/// exponent over the three CIC fields.
fn step_02_decimation(
    f: &mut DemodFields,
    inputs: &CalcInputs,
    chain: &FilterChainLu,
    warnings: &mut Vec<String>,
) {
    let requested = chain.ndec_log2 - inputs.osr_tune;
    let applied = requested.clamp(0, NDEC_LOG2_MAX);
    if applied != requested {
        let applied_steps = (chain.ndec_log2 - applied).unsigned_abs();
        warnings.push(format!(
            "OSR tune {} clamped to available head-room ({} of {} steps applied)",
            inputs.osr_tune,
            applied_steps,
            inputs.osr_tune.unsigned_abs()
        ));
    }
    f.osr_tune_applied = chain.ndec_log2 - applied;
    let mut rem = applied as u8;
    f.ndec0 = rem.min(5);
    rem -= f.ndec0;
    f.ndec1 = rem.min(3);
    rem -= f.ndec1;
    f.ndec2 = rem;
    f.ndec_pre = chain.ndec_pre;
    f.base_fil_idx = chain.base_fil_idx;
    f.fs_rx_ch = chain.fs_adc / (1u32 << applied) as f64;
}

/// Step 3: channel-filter coefficient-set selection.
///
/// `filter_k1` covers the modulation itself; `filter_k2` is widened by the
/// AFC tracking budget so the loop can still see a signal at maximum
/// frequency error. High data rates get one extra set of width because the
/// coefficient grid is too coarse there.
fn step_03_channel_filter(f: &mut DemodFields, inputs: &CalcInputs, warnings: &mut Vec<String>) {
    let target1 = f.ch_fil_bw / 2.0 / f.fs_rx_ch;
    f.filter_k1 = chflt_index(f.base_fil_idx, target1, warnings);
    if inputs.modulation().is_fsk_family() && inputs.symbol_rate >= 200_000.0 {
        f.filter_k1 = (f.filter_k1 + 1).min((CHFLT_FACTORS.len() - 1) as u8);
    }
    if inputs.afc_en == 1 {
        let afc_budget = 2.0 * inputs.freq_rf * inputs.crystal_tol * 1e-6;
        let target2 = (f.ch_fil_bw / 2.0 + afc_budget) / f.fs_rx_ch;
        f.filter_k2 = chflt_index(f.base_fil_idx, target2, warnings).max(f.filter_k1);
    } else {
        f.filter_k2 = f.filter_k1;
    }
}

/// Smallest coefficient-set index at or above `base` wide enough for the
/// normalized target bandwidth.
fn chflt_index(base: u8, target: f64, warnings: &mut Vec<String>) -> u8 {
    for i in base as usize..CHFLT_FACTORS.len() {
        if CHFLT_FACTORS[i] >= target {
            return i as u8;
        }
    }
    warnings.push(format!(
        "channel filter limited to widest coefficient set (wanted {:.3} of Fs)",
        target
    ));
    (CHFLT_FACTORS.len() - 1) as u8
}

/// Step 4: BCR oversampling ratio as a 12-bit value with 3 fraction bits.
///
/// Overflowing the register is the one fatal path in the demodulator; an OSR
/// below 7 is allowed but flagged because timing recovery degrades there.
fn step_04_bcr_osr(
    f: &mut DemodFields,
    inputs: &CalcInputs,
    warnings: &mut Vec<String>,
) -> Result<(), CalcError> {
    f.osr = f.fs_rx_ch / inputs.symbol_rate;
    let word = (f.osr * (1 << BCR_OSR_FRAC_BITS) as f64).round() as u32;
    if word > BCR_OSR_MAX {
        return Err(CalcError::BcrOsrOverflow(word));
    }
    if f.osr < BCR_OSR_MIN {
        warnings.push(format!(
            "BCR OSR {:.2} below {}, timing recovery margin reduced",
            f.osr, BCR_OSR_MIN
        ));
    }
    f.bcr_osr = word;
    Ok(())
}

/// Step 5: BCR NCO phase increment from the OSR.
fn step_05_bcr_nco(f: &mut DemodFields) {
    f.bcr_nco_offset = (((1u32 << 22) as f64 / f.osr).round() as u32).min((1 << 22) - 1);
}

/// Step 6: BCR loop gain, 11-bit.
fn step_06_bcr_gain(f: &mut DemodFields) {
    f.bcr_gain = ((((1u32 << 15) as f64) / f.osr).round() as u32).clamp(1, 0x7FF);
}

/// Step 7: preamble pattern classification.
///
/// Each enumerated selector code fixes the detector type, preamble
/// threshold, sync-skip flag and the AFC gear-switch timing as one cluster.
/// Codes 100/110/120/150/1000 exist on the Plus chip only; an unrecognized
/// code is treated as a random pattern with the detector chosen by the
/// OOK/Manchester flags.
fn step_07_preamble_pattern(f: &mut DemodFields, inputs: &CalcInputs, chip: ChipKind) {
    let cluster = match (inputs.pm_pattern, chip) {
        // Standard '1010' preamble, nominal length.
        (0, _) => (DETECTOR_PEAK, 20, 0, 2, 12),
        // Long '1010' preamble.
        (1, _) => (DETECTOR_PEAK, 24, 0, 2, 16),
        // Short '1010' preamble (under 40 bits).
        (2, _) => (DETECTOR_PEAK, 16, 0, 1, 8),
        // No usable preamble: skip preamble and sync qualification.
        (3, _) => (DETECTOR_MIN_MAX, 0, 1, 0, 0),
        // Structured non-1010 patterns.
        (4, _) => (DETECTOR_MOVING_AVG, 20, 0, 1, 10),
        (5, _) => (DETECTOR_MOVING_AVG, 22, 0, 1, 10),
        (6, _) => (DETECTOR_MOVING_AVG, 24, 0, 1, 12),
        (7, _) => (DETECTOR_MOVING_AVG, 28, 0, 1, 12),
        // Manchester-coded preambles.
        (10, _) => (DETECTOR_MOVING_AVG, 20, 0, 2, 12),
        (11, _) => (DETECTOR_MOVING_AVG, 24, 0, 2, 16),
        // Inverted '0101'.
        (13, _) => (DETECTOR_PEAK, 20, 0, 2, 12),
        // OOK patterns.
        (15, _) => (DETECTOR_MIN_MAX, 12, 0, 1, 8),
        (17, _) => (DETECTOR_MIN_MAX, 16, 0, 1, 12),
        // Plus-only: DSA short-preamble hopping variants.
        (100, ChipKind::Pro2Plus) => (DETECTOR_MIN_MAX, 8, 0, 3, 6),
        (110, ChipKind::Pro2Plus) => (DETECTOR_PEAK, 10, 0, 3, 6),
        (120, ChipKind::Pro2Plus) => (DETECTOR_MOVING_AVG, 16, 0, 3, 10),
        // Plus-only: one-shot AFC preamble.
        (150, ChipKind::Pro2Plus) => (DETECTOR_PEAK, 20, 0, 0, 4),
        // Plus-only: continuous RX hopping, no preamble qualification.
        (1000, ChipKind::Pro2Plus) => (DETECTOR_MIN_MAX, 0, 1, 3, 0),
        // Random pattern: detector by modulation/encoding.
        _ => {
            let detector = if inputs.modulation().is_ook() {
                DETECTOR_MIN_MAX
            } else if inputs.manchester == 1 {
                DETECTOR_MOVING_AVG
            } else {
                DETECTOR_PEAK
            };
            (detector, 20, 0, 2, 12)
        }
    };
    (f.detector, f.pm_thresh, f.skipsyn, f.pm_gear_sw, f.afc_pm_timeout) = cluster;
}

/// Step 8: IF placement and the signed IF frequency count.
fn step_08_if_freq(f: &mut DemodFields, inputs: &CalcInputs, outdiv: u32) {
    f.if_freq_hz = match inputs.if_mode {
        0 => 0.0,
        1 => -468_750.0,
        // Scaled IF tracks the crystal so the image lands between channels.
        _ => -(inputs.freq_xo / 64.0),
    };
    f.zero_if = (inputs.if_mode == 0) as u8;
    f.if_freq_count =
        (f.if_freq_hz * outdiv as f64 * (1 << 13) as f64 / inputs.freq_xo).round() as i32;
}

/// Step 9: raw-eye estimate and MA filter gain.
///
/// The 2-bit gain code starts at maximum and is walked down until the eye
/// estimate fits the accumulator: 13 bits when the pre-decimation stage is
/// active, 9 bits otherwise.
fn step_09_raw_eye(f: &mut DemodFields, modulator: &ModulatorFields, inputs: &CalcInputs) {
    let acc_bits = if f.ndec_pre > 1 { 13 } else { 9 };
    let acc_max = (1u32 << acc_bits) - 1;
    // RX deviation as programmed, not as commanded: OOK has no deviation and
    // estimates the eye from the chip rate instead.
    let fdev_rx = if inputs.modulation().is_ook() {
        inputs.symbol_rate * (1 + inputs.manchester) as f64
    } else {
        modulator.freq_dev as f64 * modulator.dsm_ratio
    };
    let fs_rx_ch = f.fs_rx_ch;
    let estimate = |gain: u8| ((fdev_rx * (1u32 << (gain + 9)) as f64) / fs_rx_ch).round() as u32;
    let mut gain: u8 = 3;
    while gain > 0 && estimate(gain) > acc_max {
        gain -= 1;
    }
    f.rawflt_gain = gain;
    f.raw_eye = estimate(gain).min(acc_max);
}

/// Step 10: AFC loop gain, saturated to [1, 4095].
///
/// Saturation is not silent here: when the raw value exceeds the register
/// the value is halved and the overflow flag is raised so firmware can react.
fn step_10_afc_gain(f: &mut DemodFields, inputs: &CalcInputs, dsm_ratio: f64) {
    if inputs.afc_en == 0 {
        f.afc_gain = 0;
        f.afc_gain_ovf = 0;
        return;
    }
    let scale = match f.detector {
        DETECTOR_MOVING_AVG => 1.0,
        DETECTOR_MIN_MAX => 4.0,
        _ => 2.0,
    };
    let mut raw = (inputs.symbol_rate * AFC_FACTOR * scale / dsm_ratio).round() as u32;
    if raw > AFC_GAIN_MAX {
        f.afc_gain_ovf = 1;
        raw /= 2;
    } else {
        f.afc_gain_ovf = 0;
    }
    f.afc_gain = raw.clamp(AFC_GAIN_MIN, AFC_GAIN_MAX);
}

/// Step 11: AFC limiter with the 8:1 coarse/fine split.
///
/// Values at or above 2^14 are re-encoded as `2^14 + value/8` rather than
/// clamped, trading resolution for range.
fn step_11_afc_limiter(f: &mut DemodFields, inputs: &CalcInputs, dsm_ratio: f64) {
    let limit_hz = 2.0 * inputs.freq_rf * inputs.crystal_tol * 1e-6 + inputs.symbol_rate / 4.0;
    let mut value = (limit_hz / dsm_ratio).round() as u32;
    if value >= AFC_LIMITER_COARSE_THRESHOLD {
        value = AFC_LIMITER_COARSE_THRESHOLD + value / 8;
    }
    f.afc_limiter = value.min(0xFFFF);
}

/// Step 12: AFC gear selection; the switch point comes from the preamble
/// cluster chosen in step 7.
fn step_12_afc_gears(f: &mut DemodFields, inputs: &CalcInputs) {
    f.afc_fast_gear = 0;
    f.afc_slow_gear = if inputs.afc_en == 1 { 4 } else { 0 };
    f.afc_gear_sw = f.pm_gear_sw;
}

/// Step 13: BCR gear selection by Rb-error bucket.
fn step_13_bcr_gears(f: &mut DemodFields, inputs: &CalcInputs) {
    // Loose data-rate tolerance keeps the fast gear after preamble.
    f.bcr_gear = if inputs.api_rb_error == 1 { 0 } else { 2 };
}

/// Step 14: OOK peak detector attack/decay from the oversampling ratio.
fn step_14_ook_detector(f: &mut DemodFields, inputs: &CalcInputs) {
    if !inputs.modulation().is_ook() {
        return;
    }
    let attack = (f.osr.log2().round() as i32 - 1).clamp(0, 7) as u8;
    f.ook_attack = attack;
    f.ook_decay = (attack + 4).min(15);
    f.ook_squelch = (f.skipsyn == 1) as u8;
}

/// Step 15: sync word detector configuration.
fn step_15_sync_config(f: &mut DemodFields) {
    f.sync_thresh = if f.skipsyn == 1 { 0 } else { 0xB4 };
}

/// Step 16: RSSI latch and compensation.
fn step_16_rssi(f: &mut DemodFields) {
    // Latch RSSI on preamble detect when a preamble qualifier is running.
    f.rssi_latch = (f.skipsyn == 0) as u8;
    f.rssi_comp = 0x40;
}

/// Step 17: antenna diversity configuration.
fn step_17_antenna_diversity(f: &mut DemodFields, inputs: &CalcInputs) {
    if inputs.ant_div == 1 {
        f.ant_div_mode = 2;
        f.ant2pm_thd = f.pm_thresh / 2;
    }
}

/// Step 18: signal-arrival detection / RX hopping (Plus only).
fn step_18_dsa(
    f: &mut DemodFields,
    inputs: &CalcInputs,
    chip: ChipKind,
    warnings: &mut Vec<String>,
) {
    if inputs.dsa_mode == 0 {
        return;
    }
    if chip == ChipKind::Pro2 {
        warnings.push(format!(
            "DSA mode {} not supported on Pro2, ignored",
            inputs.dsa_mode
        ));
        return;
    }
    f.dsa_en = 1;
    f.dsa_ctrl1 = 0x40 | (inputs.dsa_mode.min(2) << 4);
    f.dsa_ctrl2 = 0x14;
    f.spike_det = 0x03;
    f.rssi_thresh = 0x2E;
}

/// Step 19: one-shot AFC (Plus only).
fn step_19_one_shot_afc(f: &mut DemodFields, inputs: &CalcInputs, chip: ChipKind) {
    if chip == ChipKind::Pro2Plus && inputs.one_shot_afc == 1 {
        f.oneshot_afc = 1;
        // Estimation window in preamble bit pairs.
        f.afc_est_window = 2;
    }
}

/// Step 20: RSSI jump detection (Plus only).
fn step_20_rssi_jump(f: &mut DemodFields, inputs: &CalcInputs, chip: ChipKind) {
    if chip == ChipKind::Pro2Plus && inputs.rssi_jump_en == 1 {
        f.rssi_jump_en = 1;
        // Jump threshold in half-dB steps.
        f.rssi_jump_thresh = 0x0C;
    }
}

/// Step 21: RX VCO calibration count.
///
/// Depends only on the modulator's `outdiv` and `vco_cali_count_tx` plus the
/// IF offset already derived in step 8.
fn step_21_vco_count_rx(f: &mut DemodFields, outdiv: u32, vco_cali_count_tx: u32, freq_xo: f64) {
    let delta = (f.if_freq_hz * outdiv as f64 * 64.0 / freq_xo).round() as i64;
    f.vco_cali_count_rx = (vco_cali_count_tx as i64 + delta).max(0) as u32;
}

/// Step 22: AGC window and peak-detector decay rates.
fn step_22_agc(f: &mut DemodFields) {
    f.agc_window = (f.osr.log2().round() as i32).clamp(1, 15) as u8;
    let decay = ((f.osr * 2.0).round() as u32).min(255) as u8;
    f.agc_rfpd_decay = decay;
    f.agc_ifpd_decay = decay;
    f.agc_ovr = ((f.agc_rfpd_decay as u16) << 8) | f.agc_ifpd_decay as u16;
}

/// Step 23: final detector thresholds.
fn step_23_finalize(f: &mut DemodFields) {
    f.eye_open_thd = (f.raw_eye / 4).clamp(1, 255) as u8;
    f.ma_decay = if f.detector == DETECTOR_MOVING_AVG { 2 } else { 0 };
}
