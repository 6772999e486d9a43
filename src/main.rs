use anyhow::Context;
use clap::{Parser, Subcommand};
use pro2calc::{init_logger, log_info, CalcInputs, CalcLog, ChipKind, ModemCalc};

#[derive(Parser)]
#[command(name = "pro2calc")]
#[command(about = "Modem parameter calculator for Pro2/Pro2+ transceivers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the calculation for a test-plan file and print the registers
    Calc {
        file: String,
        /// Override the chip kind implied by the file schema (pro2, pro2plus)
        #[arg(short, long)]
        chip: Option<String>,
        /// Emit the full calculation bundle as JSON
        #[arg(long)]
        json: bool,
        /// Append the calculation log to this file
        #[arg(long)]
        log: Option<String>,
    },
    /// Print the factory default inputs
    Defaults,
    /// Print the ordered API parameter list for a test-plan file
    ApiList { file: String },
}

fn parse_chip(name: &str) -> anyhow::Result<ChipKind> {
    match name.to_ascii_lowercase().as_str() {
        "pro2" => Ok(ChipKind::Pro2),
        "pro2plus" | "pro2+" => Ok(ChipKind::Pro2Plus),
        other => anyhow::bail!("unknown chip kind: {other}"),
    }
}

fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Calc { file, chip, json, log } => {
            let (inputs, file_chip) =
                pro2calc::from_file(&file).with_context(|| format!("reading {file}"))?;
            let chip = match chip {
                Some(name) => parse_chip(&name)?,
                None => file_chip,
            };
            let sink = match log {
                Some(path) => CalcLog::with_file(path),
                None => CalcLog::new(),
            };
            let mut calc = ModemCalc::with_log(inputs, chip, sink);
            calc.calculate().context("calculation failed")?;
            if json {
                let data = calc.get_data().expect("calculated");
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                for (name, value) in calc.registers().iter() {
                    println!("{name} = 0x{value:02X}");
                }
                for warning in calc.warnings() {
                    log_info(&format!("warning: {warning}"));
                }
            }
        }
        Commands::Defaults => {
            println!("{}", serde_json::to_string_pretty(&CalcInputs::get_defaults())?);
        }
        Commands::ApiList { file } => {
            let (inputs, chip) = pro2calc::from_file(&file)?;
            let mut calc = ModemCalc::new(inputs, chip);
            calc.calculate().context("calculation failed")?;
            for (name, value) in calc.get_api_list() {
                println!("{name} = {value}");
            }
        }
    }

    Ok(())
}
