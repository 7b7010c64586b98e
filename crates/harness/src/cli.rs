//! CLI wiring for SpectraBench.

use crate::config::HarnessConfig;
use crate::report::{render_rows, render_table, write_csv_files, write_json, write_table_file};
use crate::session::BenchSession;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use spectrabench_kernels::config::{Domain, SizeSet};
use spectrabench_kernels::registry::BackendRegistry;
use spectrabench_timing::clock::ClockKind;
use spectrabench_verifier::report::{CaseOutcome, ValidationReport};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "spectrabench", about = "Validation-gated FFT back-end benchmark")]
pub struct Cli {
    /// Benchmark only the real domain.
    #[arg(long, conflicts_with = "cplx", global = true)]
    pub real: bool,

    /// Benchmark only the complex domain.
    #[arg(long, global = true)]
    pub cplx: bool,

    /// Use the composite (non power of two) size set.
    #[arg(long = "non-pow2", global = true)]
    pub non_pow2: bool,

    /// Print one line per cell instead of the MFlops table.
    #[arg(long = "no-tab", global = true)]
    pub no_tab: bool,

    #[arg(long = "budget-ms", global = true)]
    pub budget_ms: Option<f64>,

    #[arg(long = "calibration-ms", global = true)]
    pub calibration_ms: Option<f64>,

    /// Back-end used for calibration and relative timings.
    #[arg(long, global = true)]
    pub reference: Option<String>,

    /// Drop a registered back-end; repeatable.
    #[arg(long = "disable", global = true)]
    pub disable: Vec<String>,

    #[arg(long, value_enum, global = true)]
    pub clock: Option<ClockArg>,

    /// JSON configuration file; flags override its values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for CSV files and the table dump.
    #[arg(long = "output-dir", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Write the full run report as JSON.
    #[arg(long, global = true)]
    pub json: Option<PathBuf>,

    /// Do not print the per-case validation summary.
    #[arg(long = "skip-validation-report", global = true)]
    pub skip_validation_report: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum ClockArg {
    /// Process CPU time.
    Cpu,
    /// Wall-clock time.
    Wall,
}

impl From<ClockArg> for ClockKind {
    fn from(value: ClockArg) -> ClockKind {
        match value {
            ClockArg::Cpu => ClockKind::ProcessCpu,
            ClockArg::Wall => ClockKind::Monotonic,
        }
    }
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum Command {
    /// Validate, calibrate and benchmark (default).
    Run,
    /// Run the validation gate only.
    Validate,
    /// List registered back-ends and their minimum sizes.
    List,
}

impl Cli {
    /// Resolve the effective configuration: defaults, then the config file,
    /// then flags.
    pub fn to_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load_from_file(path)?,
            None => HarnessConfig::default(),
        };
        if self.real {
            config.domains = vec![Domain::Real];
        } else if self.cplx {
            config.domains = vec![Domain::Complex];
        }
        if self.non_pow2 {
            config.size_set = SizeSet::Composite;
        }
        if let Some(ms) = self.budget_ms {
            config.time_budget_secs = ms / 1000.0;
        }
        if let Some(ms) = self.calibration_ms {
            config.calibration_probe_secs = ms / 1000.0;
        }
        if let Some(reference) = &self.reference {
            config.reference_backend = reference.clone();
        }
        config.disabled_backends.extend(self.disable.iter().cloned());
        if let Some(clock) = self.clock {
            config.clock = clock.into();
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn run_cli(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let config = cli.to_config()?;
    match cli.command.unwrap_or(Command::Run) {
        Command::List => {
            let registry = BackendRegistry::with_default_backends();
            for backend in registry.backends() {
                let disabled = config.disabled_backends.iter().any(|d| d == backend.name());
                println!(
                    "{:>10}  min real {:>3}  min cplx {:>3}  align {:>2}{}",
                    backend.name(),
                    backend.min_size(Domain::Real),
                    backend.min_size(Domain::Complex),
                    backend.alignment(),
                    if disabled { "  (disabled)" } else { "" }
                );
            }
        }
        Command::Validate => {
            let session = BenchSession::new(config)?;
            let validated = session.validate()?;
            let report = validated.validation();
            if !cli.skip_validation_report {
                print_validation(report);
            }
            println!(
                "validation passed: {} cases, {} skipped",
                report.passed(),
                report.skipped()
            );
        }
        Command::Run => {
            let session = BenchSession::new(config)?;
            let validated = session.validate()?;
            if !cli.skip_validation_report {
                print_validation(validated.validation());
            }
            let report = validated.benchmark()?;
            let domains = &report.config.domains;

            for factor in &report.calibrations {
                println!(
                    "{} fft calibration: {:.1} pairs/s at N={} ({:.3} s)",
                    factor.domain,
                    factor.pairs_per_sec(),
                    factor.probe_size,
                    factor.elapsed_secs
                );
            }
            if cli.no_tab {
                for &domain in domains {
                    print!("{}", render_rows(&report.results, domain));
                }
            } else {
                print!("{}", render_table(&report.results, domains));
            }
            for &domain in domains {
                if let Some(&smallest) = report.results.sizes(domain).first() {
                    println!("smallest {domain} fft size: {smallest}");
                }
            }

            if let Some(dir) = &cli.output_dir {
                let written = write_csv_files(&report.results, report.config.size_set, dir)?;
                let table =
                    write_table_file(&report.results, domains, report.config.size_set, dir)?;
                info!(files = written.len(), table = %table.display(), "wrote csv files");
            }
            if let Some(path) = &cli.json {
                write_json(&report, path)?;
                info!(path = %path.display(), "wrote json report");
            }
            if report.results.is_empty() {
                bail!("no sizes were benchmarked");
            }
        }
    }
    Ok(())
}

fn print_validation(report: &ValidationReport) {
    for case in &report.cases {
        match &case.outcome {
            CaseOutcome::Passed { .. } => println!("{} OK for {}", case.backend, case.size),
            CaseOutcome::Skipped { reason } => {
                println!("Skipping {} for {}: {}", case.backend, case.size, reason)
            }
        }
    }
}
