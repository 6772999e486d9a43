//! Tests for the matlab-style test-plan file parser.

use std::io::Write;

use pro2calc::{CalcError, ChipKind, ModemCalc};

/// Builds a 24-value base-schema file body around the given field values.
fn base_plan(freq_xo: f64, symbol_rate: f64, fdev: f64, freq_rf_mhz: f64) -> String {
    let mut values = vec![0.0f64; 24];
    values[0] = freq_xo;
    values[1] = symbol_rate;
    values[2] = fdev;
    values[3] = 3.0; // 2GFSK
    values[4] = 20.0; // crystal tolerance ppm
    values[7] = 1.0; // AFC on
    values[11] = 2.0; // chip revision C
    values[14] = 2.0; // scaled IF
    values[16] = freq_rf_mhz;
    values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A 24-value vector parses as a base-chip plan with MHz scaled to Hz.
#[test]
fn parse_base_schema() {
    let text = format!("%% test plan\n{}\n", base_plan(26.0e6, 100_000.0, 50_000.0, 915.0));
    let (inputs, chip) = pro2calc::factory::from_str(&text).unwrap();
    assert_eq!(chip, ChipKind::Pro2);
    assert_eq!(inputs.freq_rf, 915.0e6);
    assert_eq!(inputs.symbol_rate, 100_000.0);
    assert_eq!(inputs.modulation_type, 3);
}

/// A 48-value vector selects the Plus chip and carries the Plus options.
#[test]
fn parse_plus_schema() {
    let mut values = base_plan(26.0e6, 4_800.0, 2_400.0, 868.0)
        .split_whitespace()
        .map(|t| t.parse::<f64>().unwrap())
        .collect::<Vec<_>>();
    values.resize(48, 0.0);
    values[29] = 1.0; // DSA arrival detect
    values[31] = 1.0; // RSSI jump detect
    let text = values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    let (inputs, chip) = pro2calc::factory::from_str(&text).unwrap();
    assert_eq!(chip, ChipKind::Pro2Plus);
    assert_eq!(inputs.dsa_mode, 1);
    assert_eq!(inputs.rssi_jump_en, 1);
}

/// Unknown vector lengths are rejected.
#[test]
fn reject_unknown_length() {
    let text = (0..30).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
    assert!(matches!(
        pro2calc::factory::from_str(&text),
        Err(CalcError::UnknownInputSchema(30))
    ));
}

/// Round trip through an actual file, comments included, ending in a full
/// calculation.
#[test]
fn file_to_registers() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "% reference 2GFSK plan").unwrap();
    writeln!(file, "{}", base_plan(26.0e6, 100_000.0, 50_000.0, 915.0)).unwrap();
    let (inputs, chip) = pro2calc::from_file(file.path()).unwrap();
    let mut calc = ModemCalc::new(inputs, chip);
    calc.calculate().unwrap();
    assert!(calc.registers().get("MODEM_DATA_RATE_2").is_some());
}

/// A missing file surfaces as an input-file error, not a panic.
#[test]
fn missing_file_is_error() {
    assert!(matches!(
        pro2calc::from_file("/nonexistent/plan.txt"),
        Err(CalcError::InputFileError(_))
    ));
}
