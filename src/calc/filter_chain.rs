//! # Filter Chain Lookup
//!
//! Sizes the RX decimation chain from the sample-rate ratio before the
//! demodulator pipeline starts. The result is read-only: nearly every later
//! demodulator field depends on it, so it is computed exactly once.

use serde::{Deserialize, Serialize};

use crate::constants::{ADC_CLOCK_DIV, CH_OSR_TARGET, FILTER_CHAIN_LUT, NDEC_LOG2_MAX};

use super::inputs::CalcInputs;

/// Result of the decimation/filter chain lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterChainLu {
    /// RX ADC sample rate, Hz.
    pub fs_adc: f64,
    /// Total CIC decimation exponent (chain decimates by 2^ndec_log2).
    pub ndec_log2: i32,
    /// Pre-decimation value feeding the channel filter accumulators.
    pub ndec_pre: u8,
    /// Base channel-filter coefficient-set index for this chain row.
    pub base_fil_idx: u8,
}

impl FilterChainLu {
    /// Looks up the chain row for the commanded symbol rate.
    ///
    /// The chain is sized so the channel sample rate lands at or just above
    /// the nominal oversampling target; ratios beyond the chain's reach clamp
    /// to the first/last row.
    pub fn lookup(inputs: &CalcInputs) -> Self {
        let fs_adc = inputs.freq_xo / ADC_CLOCK_DIV;
        let chip_rate = inputs.symbol_rate * (1 + inputs.manchester) as f64;
        let ratio = fs_adc / (CH_OSR_TARGET * chip_rate);
        let ndec_log2 = if ratio <= 1.0 {
            0
        } else {
            (ratio.log2().floor() as i32).min(NDEC_LOG2_MAX)
        };
        let (ndec_pre, base_fil_idx) = FILTER_CHAIN_LUT[ndec_log2 as usize];
        FilterChainLu {
            fs_adc,
            ndec_log2,
            ndec_pre,
            base_fil_idx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 26 MHz crystal at 100 ksps decimates by 2^4 (13 MHz -> 812.5 kHz).
    #[test]
    fn chain_100ksps() {
        let inputs = CalcInputs {
            freq_xo: 26.0e6,
            symbol_rate: 100_000.0,
            ..CalcInputs::default()
        };
        let lu = FilterChainLu::lookup(&inputs);
        assert_eq!(lu.fs_adc, 13.0e6);
        assert_eq!(lu.ndec_log2, 4);
        assert_eq!((lu.ndec_pre, lu.base_fil_idx), FILTER_CHAIN_LUT[4]);
    }

    /// Very low symbol rates clamp at the chain's maximum decimation.
    #[test]
    fn chain_clamps_at_max_decimation() {
        let inputs = CalcInputs {
            freq_xo: 26.0e6,
            symbol_rate: 100.0,
            ..CalcInputs::default()
        };
        assert_eq!(FilterChainLu::lookup(&inputs).ndec_log2, NDEC_LOG2_MAX);
    }

    /// Symbol rates too fast for any decimation run straight through.
    #[test]
    fn chain_clamps_at_no_decimation() {
        let inputs = CalcInputs {
            freq_xo: 26.0e6,
            symbol_rate: 2_000_000.0,
            ..CalcInputs::default()
        };
        assert_eq!(FilterChainLu::lookup(&inputs).ndec_log2, 0);
    }

    /// Manchester doubles the chip rate and so halves the chain decimation.
    #[test]
    fn chain_accounts_for_manchester() {
        let mut inputs = CalcInputs {
            freq_xo: 26.0e6,
            symbol_rate: 100_000.0,
            ..CalcInputs::default()
        };
        let plain = FilterChainLu::lookup(&inputs);
        inputs.manchester = 1;
        let coded = FilterChainLu::lookup(&inputs);
        assert_eq!(coded.ndec_log2, plain.ndec_log2 - 1);
    }
}
