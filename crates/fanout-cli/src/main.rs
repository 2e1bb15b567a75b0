//! fanout entry point.
//!
//! Usage:
//!   fanout out/dm gm backend=gl          # Run one inline job
//!   fanout -s jobs.txt out/dm            # Run a script of jobs
//!   fanout -c 4 -q out/dm skps/ b=cpu    # Four CPU workers, failures only

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use fanout_cli::Cli;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let runtime = tokio::runtime::Runtime::new().context("starting the async runtime")?;
    runtime.block_on(fanout_cli::run(cli))
}
