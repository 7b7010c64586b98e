//! Benchmark harness executable for SpectraBench.

use anyhow::Result;
use clap::Parser;
use spectrabench_harness::cli::{run_cli, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run_cli(cli)
}
