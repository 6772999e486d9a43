//! # Modem Calculator Core
//!
//! `ModemCalc` drives the fixed calculation pipeline: validate inputs, derive
//! the modulator fields, derive the demodulator fields (which read the
//! modulator's `dsm_ratio`, `outdiv` and `vco_cali_count_tx`), then pack both
//! field sets into the register image. The run is one-shot and deterministic:
//! identical inputs always reproduce a bit-identical register map.

pub mod demodulator;
pub mod filter_chain;
pub mod inputs;
pub mod modulator;
pub mod registers;

use serde::{Deserialize, Serialize};

use crate::error::CalcError;
use crate::logging::CalcLog;

use demodulator::DemodFields;
use filter_chain::FilterChainLu;
use inputs::CalcInputs;
use modulator::ModulatorFields;
use registers::RegisterMap;

/// Chip variant being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChipKind {
    Pro2,
    Pro2Plus,
}

/// Complete calculation output bundle for downstream tooling.
#[derive(Debug, Clone, Serialize)]
pub struct CalcData {
    pub chip: ChipKind,
    pub inputs: CalcInputs,
    pub modulator: ModulatorFields,
    pub demodulator: DemodFields,
    pub registers: RegisterMap,
    pub warnings: Vec<String>,
}

/// One modem parameter calculation run.
pub struct ModemCalc {
    chip: ChipKind,
    inputs: CalcInputs,
    log: CalcLog,
    modulator: Option<ModulatorFields>,
    demodulator: Option<DemodFields>,
    registers: RegisterMap,
    warnings: Vec<String>,
}

impl ModemCalc {
    /// Creates a calculator for the given inputs without a log file.
    pub fn new(inputs: CalcInputs, chip: ChipKind) -> Self {
        ModemCalc::with_log(inputs, chip, CalcLog::new())
    }

    /// Creates a calculator that writes its summary and warnings to `log`.
    pub fn with_log(inputs: CalcInputs, chip: ChipKind, log: CalcLog) -> Self {
        ModemCalc {
            chip,
            inputs,
            log,
            modulator: None,
            demodulator: None,
            registers: RegisterMap::default(),
            warnings: Vec::new(),
        }
    }

    /// Runs the full pipeline: validate, modulator, demodulator, packer.
    ///
    /// Fatal configuration errors abort the run and leave no partial register
    /// image; warnings accumulate and are flushed to the calculation log.
    pub fn calculate(&mut self) -> Result<(), CalcError> {
        self.log.add(&format!(
            "modem calc: {:?}, {} Hz carrier, {} sps, modulation {}",
            self.chip, self.inputs.freq_rf, self.inputs.symbol_rate, self.inputs.modulation_type
        ));

        let result = self.run_pipeline();
        for w in &self.warnings {
            self.log.add_warning(w);
        }
        if let Err(e) = &result {
            self.log.add(&format!("calculation aborted: {e}"));
        } else {
            self.log
                .add(&format!("calculation complete, {} registers", self.registers.len()));
        }
        result
    }

    fn run_pipeline(&mut self) -> Result<(), CalcError> {
        self.warnings = self.inputs.validate(self.chip)?;

        let mod_fields = modulator::derive(&self.inputs, self.chip);
        let chain = FilterChainLu::lookup(&self.inputs);
        let demod_fields = demodulator::derive(
            &self.inputs,
            &mod_fields,
            &chain,
            self.chip,
            &mut self.warnings,
        )?;
        self.registers = registers::pack(&self.inputs, &mod_fields, &demod_fields, self.chip);
        self.modulator = Some(mod_fields);
        self.demodulator = Some(demod_fields);
        Ok(())
    }

    /// The packed register image. Empty until `calculate` succeeds.
    pub fn registers(&self) -> &RegisterMap {
        &self.registers
    }

    /// Warnings accumulated by the last run.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// The validated inputs.
    pub fn inputs(&self) -> &CalcInputs {
        &self.inputs
    }

    /// Derived modulator fields, once calculated.
    pub fn modulator_fields(&self) -> Option<&ModulatorFields> {
        self.modulator.as_ref()
    }

    /// Derived demodulator fields, once calculated.
    pub fn demodulator_fields(&self) -> Option<&DemodFields> {
        self.demodulator.as_ref()
    }

    /// Flat ordered list of named API parameters, independent of the
    /// register layout.
    pub fn get_api_list(&self) -> Vec<(&'static str, f64)> {
        let mut list = vec![
            ("freq_xo", self.inputs.freq_xo),
            ("freq_rf", self.inputs.freq_rf),
            ("symbol_rate", self.inputs.symbol_rate),
            ("fdev", self.inputs.fdev),
            ("rx_bandwidth", self.inputs.rx_bandwidth),
            ("crystal_tol", self.inputs.crystal_tol),
            ("modulation_type", self.inputs.modulation_type as f64),
            ("manchester", self.inputs.manchester as f64),
            ("afc_en", self.inputs.afc_en as f64),
            ("ant_div", self.inputs.ant_div as f64),
            ("dsa_mode", self.inputs.dsa_mode as f64),
            ("pm_pattern", self.inputs.pm_pattern as f64),
            ("max_rb_error", self.inputs.max_rb_error),
            ("chip_version", self.inputs.chip_version as f64),
        ];
        if let Some(m) = &self.modulator {
            list.push(("dsm_ratio", m.dsm_ratio));
            list.push(("tx_data_rate", m.tx_data_rate as f64));
            list.push(("outdiv", m.outdiv as f64));
        }
        if let Some(d) = &self.demodulator {
            list.push(("rx_osr", d.osr));
            list.push(("if_freq", d.if_freq_hz));
            list.push(("afc_gain", d.afc_gain as f64));
            list.push(("afc_limiter", d.afc_limiter as f64));
        }
        list
    }

    /// The complete output bundle, once calculated.
    pub fn get_data(&self) -> Option<CalcData> {
        Some(CalcData {
            chip: self.chip,
            inputs: self.inputs.clone(),
            modulator: self.modulator.clone()?,
            demodulator: self.demodulator.clone()?,
            registers: self.registers.clone(),
            warnings: self.warnings.clone(),
        })
    }
}
