//! # Test-Plan File Factory
//!
//! Parses the legacy matlab-style test-plan format into [`CalcInputs`]:
//! lines starting with `%` (or trailing `%` comments) are stripped, and the
//! remaining numeric tokens are collected positionally into one fixed-length
//! input vector. Four legacy schema generations exist, identified purely by
//! token count: 24/27/29 values (base chip) and 48/49 values (Plus chip).
//! Any other count is fatal. The carrier frequency at index 16 is stored in
//! MHz and scaled to Hz here.
//!
//! Base vector layout (the 27/29 schemas append reserved values, the Plus
//! schemas append the Plus-only options starting at index 29):
//!
//! | idx | field            | idx | field            |
//! |-----|------------------|-----|------------------|
//! | 0   | freq_xo (Hz)     | 9   | pm_pattern       |
//! | 1   | symbol_rate      | 10  | max_rb_error     |
//! | 2   | fdev (Hz)        | 11  | chip_version     |
//! | 3   | modulation_type  | 12  | hi_pfm_div_mode  |
//! | 4   | crystal_tol      | 13  | osr_tune         |
//! | 5   | rx_bandwidth     | 14  | if_mode          |
//! | 6   | manchester       | 15  | reserved         |
//! | 7   | afc_en           | 16  | freq_rf (MHz)    |
//! | 8   | ant_div          | 17+ | reserved         |
//!
//! Plus extension: 29 dsa_mode, 30 one_shot_afc, 31 rssi_jump_en,
//! 32 pa_ramp_trim, remainder reserved.

use std::fs;
use std::path::Path;

use nom::number::complete::double;

use crate::calc::inputs::CalcInputs;
use crate::calc::ChipKind;
use crate::error::CalcError;

/// Carrier-frequency index fixed by the legacy format (value is in MHz).
const FREQ_RF_MHZ_INDEX: usize = 16;

/// Parses a test-plan file into inputs and the chip kind its schema implies.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<(CalcInputs, ChipKind), CalcError> {
    let text = fs::read_to_string(path.as_ref())
        .map_err(|e| CalcError::InputFileError(format!("{}: {e}", path.as_ref().display())))?;
    from_str(&text)
}

/// Parses test-plan file contents.
pub fn from_str(text: &str) -> Result<(CalcInputs, ChipKind), CalcError> {
    let values = tokenize(text)?;
    build_inputs(&values)
}

/// Collects all numeric tokens, skipping `%` comments.
fn tokenize(text: &str) -> Result<Vec<f64>, CalcError> {
    let mut values = Vec::new();
    for line in text.lines() {
        let data = line.split('%').next().unwrap_or("");
        for token in data.split_whitespace() {
            values.push(parse_value(token)?);
        }
    }
    Ok(values)
}

fn parse_value(token: &str) -> Result<f64, CalcError> {
    match double::<_, nom::error::Error<&str>>(token) {
        Ok(("", value)) => Ok(value),
        Ok((rest, _)) => Err(CalcError::InputFileError(format!(
            "trailing garbage {rest:?} in token {token:?}"
        ))),
        Err(_) => Err(CalcError::InputFileError(format!(
            "not a number: {token:?}"
        ))),
    }
}

fn build_inputs(values: &[f64]) -> Result<(CalcInputs, ChipKind), CalcError> {
    let chip = match values.len() {
        24 | 27 | 29 => ChipKind::Pro2,
        48 | 49 => ChipKind::Pro2Plus,
        n => return Err(CalcError::UnknownInputSchema(n)),
    };

    let mut inputs = CalcInputs {
        freq_xo: values[0],
        symbol_rate: values[1],
        fdev: values[2],
        modulation_type: values[3] as u8,
        crystal_tol: values[4],
        rx_bandwidth: values[5],
        manchester: values[6] as u8,
        afc_en: values[7] as u8,
        ant_div: values[8] as u8,
        pm_pattern: values[9] as i32,
        max_rb_error: values[10],
        chip_version: values[11] as u8,
        hi_pfm_div_mode: values[12] as u8,
        osr_tune: values[13] as i32,
        if_mode: values[14] as u8,
        freq_rf: values[FREQ_RF_MHZ_INDEX] * 1e6,
        ..CalcInputs::default()
    };

    if chip == ChipKind::Pro2Plus {
        inputs.dsa_mode = values[29] as u8;
        inputs.one_shot_afc = values[30] as u8;
        inputs.rssi_jump_en = values[31] as u8;
        inputs.pa_ramp_trim = values[32] as u8;
    }

    Ok((inputs, chip))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Comments and blank lines are transparent to the tokenizer.
    #[test]
    fn tokenize_skips_comments() {
        let text = "% header comment\n1 2.5 % trailing\n\n3e3\n";
        assert_eq!(tokenize(text).unwrap(), vec![1.0, 2.5, 3000.0]);
    }

    /// Non-numeric tokens are rejected with the offending text.
    #[test]
    fn tokenize_rejects_garbage() {
        assert!(matches!(
            tokenize("1 2 banana"),
            Err(CalcError::InputFileError(_))
        ));
    }

    /// A vector length outside the known schemas is fatal.
    #[test]
    fn unknown_schema_length() {
        let values = vec![0.0; 25];
        assert!(matches!(
            build_inputs(&values),
            Err(CalcError::UnknownInputSchema(25))
        ));
    }
}
