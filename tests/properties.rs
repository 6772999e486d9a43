//! Property tests: the calculator never panics on in-range inputs, and every
//! successful run respects the register-width and determinism contracts.

use proptest::prelude::*;

use pro2calc::{CalcInputs, ChipKind, ModemCalc};

fn arb_inputs() -> impl Strategy<Value = CalcInputs> {
    (
        25.0e6..32.0e6f64,
        850.0e6..1050.0e6f64,
        500.0..1_000_000.0f64,
        250.0..300_000.0f64,
        0u8..=5,
        0u8..=1,
        0u8..=1,
        0i32..=31,
        0.0..0.2f64,
    )
        .prop_map(
            |(freq_xo, freq_rf, symbol_rate, fdev, modulation_type, manchester, afc_en, pm_pattern, max_rb_error)| {
                CalcInputs {
                    freq_xo,
                    freq_rf,
                    symbol_rate,
                    fdev,
                    modulation_type,
                    manchester,
                    afc_en,
                    pm_pattern,
                    max_rb_error,
                    // Auto bandwidth keeps OOK configurations feasible.
                    rx_bandwidth: 0.0,
                    ..CalcInputs::default()
                }
            },
        )
}

proptest! {
    /// Any in-range input either calculates cleanly or fails with one of the
    /// enumerated fatal errors; it never panics and never emits an
    /// out-of-width composite field.
    #[test]
    fn calculation_is_total_and_in_range(inputs in arb_inputs()) {
        for chip in [ChipKind::Pro2, ChipKind::Pro2Plus] {
            let mut calc = ModemCalc::new(inputs.clone(), chip);
            if calc.calculate().is_ok() {
                let m = calc.modulator_fields().unwrap();
                prop_assert!(m.freq_dev < (1 << 17));
                prop_assert!(m.tx_data_rate < (1 << 24));
                let d = calc.demodulator_fields().unwrap();
                prop_assert!(d.bcr_osr <= 0xFFF);
                prop_assert!(d.afc_gain <= 4095);
                prop_assert!(d.rawflt_gain <= 3);
            }
        }
    }

    /// Repeating a successful run reproduces the identical register image.
    #[test]
    fn calculation_is_deterministic(inputs in arb_inputs()) {
        let mut a = ModemCalc::new(inputs.clone(), ChipKind::Pro2);
        let mut b = ModemCalc::new(inputs, ChipKind::Pro2);
        let ra = a.calculate().is_ok();
        let rb = b.calculate().is_ok();
        prop_assert_eq!(ra, rb);
        prop_assert_eq!(a.registers(), b.registers());
    }
}
