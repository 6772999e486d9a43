//! # Register Packer
//!
//! Assembles the derived modulator/demodulator fields into the byte-level
//! register image the chip expects. Pure bit-packing: shifting and OR-ing
//! sub-fields into 8-bit entries, splitting wider composites MSB-first into
//! `_N` suffixed bytes, and the one's/two's-complement handling of the signed
//! IF frequency offset. Built once per run, read-only afterward.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::calc::demodulator::DemodFields;
use crate::calc::inputs::CalcInputs;
use crate::calc::modulator::ModulatorFields;
use crate::calc::ChipKind;

/// Ordered register-name -> byte mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisterMap {
    regs: BTreeMap<&'static str, u8>,
}

impl RegisterMap {
    fn set(&mut self, name: &'static str, value: u32) {
        debug_assert!(value <= 0xFF, "{name} value {value} exceeds 8 bits");
        self.regs.insert(name, (value & 0xFF) as u8);
    }

    /// Splits `value` MSB-first over the named byte entries.
    fn set_split(&mut self, names: &[&'static str], value: u32) {
        for (i, name) in names.iter().enumerate() {
            let shift = 8 * (names.len() - 1 - i);
            self.set(name, (value >> shift) & 0xFF);
        }
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.regs.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u8)> + '_ {
        self.regs.iter().map(|(&k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }
}

/// Packs the fully derived fields into the register image.
pub fn pack(
    inputs: &CalcInputs,
    modulator: &ModulatorFields,
    demod: &DemodFields,
    chip: ChipKind,
) -> RegisterMap {
    let mut r = RegisterMap::default();
    pack_base(&mut r, inputs, modulator, demod);
    if chip == ChipKind::Pro2Plus {
        pack_plus_overlay(&mut r, modulator, demod);
    }
    r
}

fn pack_base(r: &mut RegisterMap, inputs: &CalcInputs, m: &ModulatorFields, d: &DemodFields) {
    r.set(
        "MODEM_MOD_TYPE",
        inputs.modulation_type as u32 | ((inputs.manchester as u32) << 3),
    );
    r.set(
        "MODEM_CLKGEN_BAND",
        m.band as u32 | ((inputs.hi_pfm_div_mode as u32) << 3),
    );

    // Synthesizer.
    r.set("FREQ_CONTROL_INTE", m.fc_inte);
    r.set_split(
        &[
            "FREQ_CONTROL_FRAC_2",
            "FREQ_CONTROL_FRAC_1",
            "FREQ_CONTROL_FRAC_0",
        ],
        m.fc_frac & 0x000F_FFFF,
    );
    r.set_split(
        &["FREQ_CONTROL_VCOCNT_1", "FREQ_CONTROL_VCOCNT_0"],
        m.vco_cali_count_tx,
    );
    r.set_split(
        &["FREQ_CONTROL_VCOCNT_RX_1", "FREQ_CONTROL_VCOCNT_RX_0"],
        d.vco_cali_count_rx & 0xFFFF,
    );

    // TX path.
    r.set_split(
        &["MODEM_FREQ_DEV_2", "MODEM_FREQ_DEV_1", "MODEM_FREQ_DEV_0"],
        m.freq_dev,
    );
    r.set_split(
        &["MODEM_DATA_RATE_2", "MODEM_DATA_RATE_1", "MODEM_DATA_RATE_0"],
        m.tx_data_rate,
    );
    r.set_split(
        &[
            "MODEM_TX_NCO_MODE_3",
            "MODEM_TX_NCO_MODE_2",
            "MODEM_TX_NCO_MODE_1",
            "MODEM_TX_NCO_MODE_0",
        ],
        m.tx_nco_mode,
    );
    r.set("PA_TC", m.pa_tc as u32);

    // Decimation and channel filter.
    r.set(
        "MODEM_DECIMATION_CFG1",
        ((d.ndec0 as u32) << 4) | ((d.ndec1 as u32) << 2) | d.ndec2 as u32,
    );
    // Pre-decimation is stored as its log2 code.
    let pre_code = match d.ndec_pre {
        1 => 0u32,
        2 => 1,
        4 => 2,
        _ => 3,
    };
    r.set("MODEM_DECIMATION_CFG0", (pre_code << 4) | d.base_fil_idx as u32);
    r.set("MODEM_CHFLT_K1", d.filter_k1 as u32);
    r.set("MODEM_CHFLT_K2", d.filter_k2 as u32);

    // Bit/clock recovery.
    r.set_split(&["MODEM_BCR_OSR_1", "MODEM_BCR_OSR_0"], d.bcr_osr);
    r.set_split(
        &[
            "MODEM_BCR_NCO_OFFSET_2",
            "MODEM_BCR_NCO_OFFSET_1",
            "MODEM_BCR_NCO_OFFSET_0",
        ],
        d.bcr_nco_offset,
    );
    r.set_split(&["MODEM_BCR_GAIN_1", "MODEM_BCR_GAIN_0"], d.bcr_gain);
    r.set("MODEM_BCR_GEAR", d.bcr_gear as u32);

    // IF frequency: 18-bit two's-complement pattern, forced to zero in
    // zero-IF mode.
    let if_word = if d.zero_if == 1 {
        0u32
    } else if d.if_freq_count < 0 {
        ((d.if_freq_count + (1 << 18)) as u32) & 0x0003_FFFF
    } else {
        (d.if_freq_count as u32) & 0x0003_FFFF
    };
    r.set("MODEM_IF_CONTROL", inputs.if_mode as u32);
    r.set_split(
        &["MODEM_IF_FREQ_2", "MODEM_IF_FREQ_1", "MODEM_IF_FREQ_0"],
        if_word,
    );

    // AFC loop. The overflow flag rides the top bit of the gain MSB.
    r.set(
        "MODEM_AFC_GEAR",
        ((d.afc_gear_sw as u32) << 6) | ((d.afc_fast_gear as u32) << 3) | d.afc_slow_gear as u32,
    );
    r.set("MODEM_AFC_WAIT", d.afc_pm_timeout as u32);
    r.set(
        "MODEM_AFC_GAIN_1",
        ((d.afc_gain >> 8) & 0x0F) | ((d.afc_gain_ovf as u32) << 7),
    );
    r.set("MODEM_AFC_GAIN_0", d.afc_gain & 0xFF);
    r.set_split(
        &["MODEM_AFC_LIMITER_1", "MODEM_AFC_LIMITER_0"],
        d.afc_limiter & 0xFFFF,
    );

    // Raw eye / MA filter.
    r.set_split(&["MODEM_RAW_EYE_1", "MODEM_RAW_EYE_0"], d.raw_eye & 0x1FFF);
    r.set(
        "MODEM_RAW_CONTROL",
        ((d.ma_decay as u32) << 4) | d.rawflt_gain as u32,
    );
    r.set("MODEM_EYE_OPEN_THD", d.eye_open_thd as u32);

    // Preamble / sync detectors.
    r.set(
        "PREAMBLE_CONFIG",
        ((d.detector as u32) << 4) | ((d.skipsyn as u32) << 1),
    );
    r.set("PREAMBLE_CONFIG_STD_1", d.pm_thresh as u32);
    r.set("SYNC_CONFIG", d.sync_thresh as u32);

    // OOK detector.
    r.set(
        "MODEM_OOK_PDTC",
        ((d.ook_attack as u32) << 4) | d.ook_decay as u32,
    );
    r.set("MODEM_OOK_CNT1", d.ook_squelch as u32);

    // RSSI and antenna diversity.
    r.set("MODEM_RSSI_CONTROL", d.rssi_latch as u32);
    r.set("MODEM_RSSI_COMP", d.rssi_comp as u32);
    r.set("MODEM_ANT_DIV_MODE", d.ant_div_mode as u32);
    r.set("MODEM_ANT_DIV_CONTROL", d.ant2pm_thd as u32);

    // AGC.
    r.set("MODEM_AGC_WINDOW_SIZE", d.agc_window as u32);
    r.set("MODEM_AGC_RFPD_DECAY", d.agc_rfpd_decay as u32);
    r.set("MODEM_AGC_IFPD_DECAY", d.agc_ifpd_decay as u32);
    r.set_split(
        &["MODEM_AGC_OVERRIDE_1", "MODEM_AGC_OVERRIDE_0"],
        d.agc_ovr as u32,
    );
}

/// Plus-only registers, layered on top of the base set. The AGC override MSB
/// is re-derived here because the Plus chip folds the RSSI-jump enable into
/// its top bit.
fn pack_plus_overlay(r: &mut RegisterMap, m: &ModulatorFields, d: &DemodFields) {
    r.set("PA_RAMP_EX", m.pa_ramp as u32);
    r.set("MODEM_DSA_CTRL1", d.dsa_ctrl1 as u32);
    r.set("MODEM_DSA_CTRL2", d.dsa_ctrl2 as u32);
    r.set("MODEM_SPIKE_DET", d.spike_det as u32);
    r.set("MODEM_RSSI_THRESH", d.rssi_thresh as u32);
    r.set(
        "MODEM_ONE_SHOT_AFC",
        ((d.oneshot_afc as u32) << 4) | d.afc_est_window as u32,
    );
    r.set("MODEM_RSSI_JUMP_THRESH", d.rssi_jump_thresh as u32);
    r.set(
        "MODEM_AGC_OVERRIDE_1",
        ((d.rssi_jump_en as u32) << 7) | (((d.agc_ovr as u32) >> 8) & 0x7F),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A negative IF count packs as an 18-bit two's-complement pattern.
    #[test]
    fn if_freq_two_complement() {
        let inputs = CalcInputs {
            freq_xo: 26.0e6,
            freq_rf: 915.0e6,
            symbol_rate: 100_000.0,
            fdev: 50_000.0,
            ..CalcInputs::default()
        };
        let m = crate::calc::modulator::derive(&inputs, ChipKind::Pro2);
        let chain = crate::calc::filter_chain::FilterChainLu::lookup(&inputs);
        let mut w = Vec::new();
        let d = crate::calc::demodulator::derive(&inputs, &m, &chain, ChipKind::Pro2, &mut w)
            .unwrap();
        assert!(d.if_freq_count < 0);
        let r = pack(&inputs, &m, &d, ChipKind::Pro2);
        let word = ((r.get("MODEM_IF_FREQ_2").unwrap() as u32) << 16)
            | ((r.get("MODEM_IF_FREQ_1").unwrap() as u32) << 8)
            | r.get("MODEM_IF_FREQ_0").unwrap() as u32;
        assert_eq!(word, (d.if_freq_count + (1 << 18)) as u32);
    }

    /// A carrier outside every synthesizer band still packs the saturated
    /// feedback-divider integer inside its single byte.
    #[test]
    fn out_of_band_carrier_packs_in_width() {
        let inputs = CalcInputs {
            freq_xo: 26.0e6,
            freq_rf: 5.0e9,
            symbol_rate: 100_000.0,
            fdev: 50_000.0,
            ..CalcInputs::default()
        };
        let m = crate::calc::modulator::derive(&inputs, ChipKind::Pro2);
        let chain = crate::calc::filter_chain::FilterChainLu::lookup(&inputs);
        let mut w = Vec::new();
        let d = crate::calc::demodulator::derive(&inputs, &m, &chain, ChipKind::Pro2, &mut w)
            .unwrap();
        let r = pack(&inputs, &m, &d, ChipKind::Pro2);
        assert_eq!(r.get("FREQ_CONTROL_INTE"), Some(0xFF));
    }

    /// Zero-IF mode forces the packed IF frequency to zero.
    #[test]
    fn zero_if_packs_zero() {
        let inputs = CalcInputs {
            freq_xo: 26.0e6,
            freq_rf: 915.0e6,
            symbol_rate: 100_000.0,
            fdev: 50_000.0,
            if_mode: 0,
            ..CalcInputs::default()
        };
        let m = crate::calc::modulator::derive(&inputs, ChipKind::Pro2);
        let chain = crate::calc::filter_chain::FilterChainLu::lookup(&inputs);
        let mut w = Vec::new();
        let d = crate::calc::demodulator::derive(&inputs, &m, &chain, ChipKind::Pro2, &mut w)
            .unwrap();
        let r = pack(&inputs, &m, &d, ChipKind::Pro2);
        assert_eq!(r.get("MODEM_IF_FREQ_2"), Some(0));
        assert_eq!(r.get("MODEM_IF_FREQ_1"), Some(0));
        assert_eq!(r.get("MODEM_IF_FREQ_0"), Some(0));
    }

    /// Multi-byte composites reassemble to the source value.
    #[test]
    fn split_fields_reassemble() {
        let inputs = CalcInputs {
            freq_xo: 26.0e6,
            freq_rf: 915.0e6,
            symbol_rate: 100_000.0,
            fdev: 50_000.0,
            ..CalcInputs::default()
        };
        let m = crate::calc::modulator::derive(&inputs, ChipKind::Pro2);
        let chain = crate::calc::filter_chain::FilterChainLu::lookup(&inputs);
        let mut w = Vec::new();
        let d = crate::calc::demodulator::derive(&inputs, &m, &chain, ChipKind::Pro2, &mut w)
            .unwrap();
        let r = pack(&inputs, &m, &d, ChipKind::Pro2);

        let dr = ((r.get("MODEM_DATA_RATE_2").unwrap() as u32) << 16)
            | ((r.get("MODEM_DATA_RATE_1").unwrap() as u32) << 8)
            | r.get("MODEM_DATA_RATE_0").unwrap() as u32;
        assert_eq!(dr, m.tx_data_rate);

        let osr = ((r.get("MODEM_BCR_OSR_1").unwrap() as u32) << 8)
            | r.get("MODEM_BCR_OSR_0").unwrap() as u32;
        assert_eq!(osr, d.bcr_osr);
    }

    /// The Plus overlay adds its registers and folds the RSSI-jump enable
    /// into the AGC override MSB.
    #[test]
    fn plus_overlay_registers() {
        let inputs = CalcInputs {
            freq_xo: 26.0e6,
            freq_rf: 915.0e6,
            symbol_rate: 4_800.0,
            fdev: 2_400.0,
            dsa_mode: 1,
            rssi_jump_en: 1,
            ..CalcInputs::default()
        };
        let m = crate::calc::modulator::derive(&inputs, ChipKind::Pro2Plus);
        let chain = crate::calc::filter_chain::FilterChainLu::lookup(&inputs);
        let mut w = Vec::new();
        let d =
            crate::calc::demodulator::derive(&inputs, &m, &chain, ChipKind::Pro2Plus, &mut w)
                .unwrap();
        let r = pack(&inputs, &m, &d, ChipKind::Pro2Plus);
        assert!(r.get("PA_RAMP_EX").is_some());
        assert!(r.get("MODEM_DSA_CTRL1").is_some());
        assert_eq!(r.get("MODEM_AGC_OVERRIDE_1").unwrap() >> 7, 1);

        // Base image has none of the overlay registers.
        let rb = pack(&inputs, &m, &d, ChipKind::Pro2);
        assert!(rb.get("PA_RAMP_EX").is_none());
    }
}
