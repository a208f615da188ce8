//! `loadctl` – run the load regulation core against a simulated source.
//!
//! The CLI loads `loadctl.toml` (optional), builds a [`SimBench`] with the
//! selected source model, sends one write command through the bench
//! transport and runs the controller for a fixed number of scheduler passes.
//! The final operating point and error record are printed on exit.
//!
//! ```text
//! loadctl cp 30 --passes 600
//! loadctl mppt 0 --source solar
//! ```

mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use loadctl_control::Controller;
use loadctl_hal::MeasurementSource;
use loadctl_hal::sim::{SimBench, SimOutputPin, SourceModel};
use loadctl_types::{CommandKind, ErrorRecord, LoadError, MeasurementSnapshot, RegulationMode};
use thiserror::Error;
use tracing::{error, info};

use crate::config::{Config, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Constant current (A)
    Cc,
    /// Constant voltage (V)
    Cv,
    /// Constant power, CC output state (W)
    Cp,
    /// Constant power, CV output state (W)
    CpCv,
    /// Constant resistance, CC output state (Ω)
    Cr,
    /// Constant resistance, CV output state (Ω)
    CrCv,
    /// Constant voltage through the current loop (V)
    CvSoftware,
    /// Maximum power point tracking, 0 to search from open circuit (V)
    Mppt,
}

impl Mode {
    fn kind(self) -> CommandKind {
        match self {
            Mode::Cc => CommandKind::ConstantCurrent,
            Mode::Cv => CommandKind::ConstantVoltage,
            Mode::Cp => CommandKind::ConstantPowerCc,
            Mode::CpCv => CommandKind::ConstantPowerCv,
            Mode::Cr => CommandKind::ConstantResistanceCc,
            Mode::CrCv => CommandKind::ConstantResistanceCv,
            Mode::CvSoftware => CommandKind::ConstantVoltageSoftware,
            Mode::Mppt => CommandKind::Mppt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    /// Voltage source behind a series resistance
    Thevenin,
    /// Photovoltaic panel curve
    Solar,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the load regulation core against a simulated source", long_about = None)]
struct Args {
    #[arg(value_enum, help = "Regulation mode")]
    mode: Mode,

    #[arg(help = "Setpoint in A, V, W or Ω depending on the mode")]
    value: f64,

    #[arg(short, long, help = "Scheduler passes to run", default_value = "500")]
    passes: usize,

    #[arg(short, long, help = "Simulated source", value_enum, default_value = "thevenin")]
    source: Source,

    #[arg(short, long, help = "Path to loadctl.toml (overrides LOADCTL_CONFIG)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Print the operating point every N passes")]
    report_every: Option<usize>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Setpoint(#[from] LoadError),
}

/// Outcome of a bench run.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Report {
    mode: RegulationMode,
    setpoint: u32,
    sample: MeasurementSnapshot,
    error: ErrorRecord,
}

fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();

    match run(&args) {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "bench run failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<Report, CliError> {
    let cfg = config::load(args.config.as_deref())?;
    let kind = args.mode.kind();
    let setpoint = setpoint_raw(kind.mode(), args.value)?;
    let source = match args.source {
        Source::Thevenin => cfg.bench.thevenin.model(),
        Source::Solar => cfg.bench.solar.model(),
    };
    info!(
        mode = %kind.mode(),
        setpoint,
        passes = args.passes,
        ?source,
        "starting bench run"
    );
    Ok(run_bench(
        &cfg,
        source,
        kind,
        setpoint,
        args.passes,
        args.report_every,
    ))
}

/// Convert an SI setpoint into the mode's raw sub-unit.
fn setpoint_raw(mode: RegulationMode, value: f64) -> Result<u32, LoadError> {
    let raw = (value * mode.unit().per_base_unit()).round();
    if !raw.is_finite() || raw < 0.0 || raw > f64::from(u32::MAX) {
        return Err(LoadError::SetpointOutOfRange { mode, value });
    }
    Ok(raw as u32)
}

fn run_bench(
    cfg: &Config,
    source: SourceModel,
    kind: CommandKind,
    setpoint: u32,
    passes: usize,
    report_every: Option<usize>,
) -> Report {
    let mut bench = SimBench::new(source).with_sample_period_ms(cfg.bench.sample_period_ms);
    let (current, voltage) = bench.actuators(cfg.bench.max_current_ua, cfg.bench.max_voltage_uv);
    let mut controller = Controller::new(cfg.control.clone(), current, voltage, SimOutputPin::new());

    bench.send(kind, setpoint);
    controller.set_cccv(kind.cccv_hint());

    for pass in 0..passes {
        controller.run_pass(&bench, &bench, &bench);
        bench.advance(controller.current(), controller.voltage());
        if let Some(every) = report_every
            && every > 0
            && pass % every == 0
        {
            print_sample(pass, &bench.snapshot());
        }
    }

    Report {
        mode: controller.mode(),
        setpoint: controller.setpoint(),
        sample: bench.snapshot(),
        error: controller.error(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn si(raw: u32, per_base_unit: f64) -> f64 {
    f64::from(raw) / per_base_unit
}

fn print_sample(pass: usize, s: &MeasurementSnapshot) {
    println!(
        "  {:>6}  {:>9.4} V  {:>9.4} A  {:>9.4} W",
        pass,
        si(s.voltage_uv, 1e6),
        si(s.current_ua, 1e6),
        si(s.power_uw, 1e6),
    );
}

fn print_report(report: &Report) {
    let unit = report.mode.unit();
    let s = &report.sample;
    println!();
    println!(
        "  {} {} {}",
        report.mode.to_string().bold().cyan(),
        format!("{:.4}", si(report.setpoint, unit.per_base_unit())).bold(),
        unit.symbol()
    );
    println!("    voltage     {:>10.4} V", si(s.voltage_uv, 1e6));
    println!("    current     {:>10.4} A", si(s.current_ua, 1e6));
    println!("    power       {:>10.4} W", si(s.power_uw, 1e6));
    if s.current_ua == 0 {
        println!("    resistance  {:>10} Ω", "open".dimmed());
    } else {
        println!("    resistance  {:>10.4} Ω", si(s.resistance_mohm, 1e3));
    }
    if report.error.counter == 0 {
        println!("    faults      {}", "none".green());
    } else {
        println!(
            "    faults      {} (last {})",
            report.error.counter.to_string().red().bold(),
            report.error.code
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setpoint_scales_to_sub_units() {
        assert_eq!(
            setpoint_raw(RegulationMode::ConstantCurrent, 1.5),
            Ok(1_500_000)
        );
        assert_eq!(
            setpoint_raw(RegulationMode::ConstantResistance, 10.0),
            Ok(10_000)
        );
        assert_eq!(
            setpoint_raw(RegulationMode::ConstantPower, 0.0000004),
            Ok(0)
        );
    }

    #[test]
    fn setpoint_outside_u32_is_rejected() {
        for value in [-1.0, 5_000.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                setpoint_raw(RegulationMode::ConstantVoltage, value),
                Err(LoadError::SetpointOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn every_mode_maps_to_its_command() {
        assert_eq!(Mode::Cp.kind().mode(), RegulationMode::ConstantPower);
        assert_eq!(Mode::CrCv.kind().mode(), RegulationMode::ConstantResistance);
        assert_eq!(Mode::CvSoftware.kind().mode(), RegulationMode::ConstantVoltageSoftware);
        assert_eq!(Mode::Mppt.kind(), CommandKind::Mppt);
    }

    #[test]
    fn args_parse_mode_and_value() {
        let args = Args::try_parse_from(["loadctl", "cv-software", "12.5", "--passes", "50"])
            .expect("valid args");
        assert_eq!(args.mode, Mode::CvSoftware);
        assert_eq!(args.value, 12.5);
        assert_eq!(args.passes, 50);
        assert_eq!(args.source, Source::Thevenin);
    }

    #[test]
    fn bench_run_reports_constant_current_operating_point() {
        let cfg = Config::default();
        let report = run_bench(
            &cfg,
            cfg.bench.thevenin.model(),
            CommandKind::ConstantCurrent,
            3_000_000,
            5,
            None,
        );
        assert_eq!(report.mode, RegulationMode::ConstantCurrent);
        assert_eq!(report.setpoint, 3_000_000);
        assert_eq!(report.sample.current_ua, 3_000_000);
        assert_eq!(report.sample.voltage_uv, 18_000_000);
        assert_eq!(report.error, ErrorRecord::default());
    }
}
