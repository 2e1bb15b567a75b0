//! # fanout
//!
//! Runs a worker binary over many sources in parallel.
//!
//! ```text
//! fanout [OPTIONS] <BINARY> [JOB]...
//! fanout -c 8 out/dm gm backend=gl
//! fanout -s jobs.txt out/dm
//! ```
//!
//! A job is a list of tokens: catalog names, file paths or globs, and
//! `key=value` flags forwarded to the worker as `--key value`. Inline job
//! tokens form one job; each non-blank line of a script is another.
//!
//! ## Configuration
//!
//! - `FANOUT_CPU_LIMIT` - CPU worker count (default: available processors)
//! - `FANOUT_GPU_LIMIT` - GPU worker count (default: `min(8, processors)`)
//! - `RUST_LOG` - log filter (default: `info`)

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use fanout_core::{
    Catalog, DispatchConfig, Dispatcher, JobParser, LocalFs, ProcessRunner, Summary,
    WorkDescriptor,
};
use tokio::io::AsyncReadExt;

/// Parallel batch dispatcher for a worker binary.
#[derive(Debug, Parser)]
#[command(name = "fanout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Worker binary to invoke.
    pub binary: PathBuf,

    /// Inline job: catalog names, paths or globs, and key=value flags.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub job: Vec<String>,

    /// File of jobs, one per line ("-" reads stdin).
    #[arg(short = 's', long)]
    pub script: Option<PathBuf>,

    /// Shuffle sources before batching.
    #[arg(
        short = 'r',
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = true,
        default_missing_value = "true"
    )]
    pub random: bool,

    /// Only log failures.
    #[arg(short, long)]
    pub quiet: bool,

    /// Match catalog names exactly instead of by substring.
    #[arg(short, long)]
    pub exact: bool,

    /// CPU worker count.
    #[arg(short = 'c', long = "cpuLimit", env = "FANOUT_CPU_LIMIT")]
    pub cpu_limit: Option<NonZeroUsize>,

    /// GPU worker count.
    #[arg(short = 'g', long = "gpuLimit", env = "FANOUT_GPU_LIMIT")]
    pub gpu_limit: Option<NonZeroUsize>,
}

impl Cli {
    /// The dispatcher configuration these arguments describe.
    #[must_use]
    pub fn config(&self) -> DispatchConfig {
        let mut config = DispatchConfig::new(&self.binary)
            .with_shuffle(self.random)
            .with_quiet(self.quiet)
            .with_exact(self.exact);
        if let Some(limit) = self.cpu_limit {
            config = config.with_cpu_limit(limit.get());
        }
        if let Some(limit) = self.gpu_limit {
            config = config.with_gpu_limit(limit.get());
        }
        config
    }

    /// Every job's tokens: the inline job first, then the script's lines.
    pub async fn jobs(&self) -> Result<Vec<Vec<String>>> {
        let mut jobs = Vec::new();
        if !self.job.is_empty() {
            jobs.push(self.job.clone());
        }
        if let Some(script) = &self.script {
            let text = read_script(script).await?;
            jobs.extend(split_script(&text));
        }
        Ok(jobs)
    }
}

async fn read_script(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("reading jobs from stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading script {}", path.display()))
}

/// Split a script into jobs: one per line, whitespace-separated tokens.
pub fn split_script(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| line.split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .filter(|tokens| !tokens.is_empty())
        .collect()
}

/// Resolve, parse, dispatch, and report. Every job is parsed before any
/// work starts, so a bad job aborts the run with nothing dispatched.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.config();
    let jobs = cli.jobs().await?;
    if jobs.is_empty() {
        tracing::warn!("no jobs given; nothing to do");
        return Ok(ExitCode::SUCCESS);
    }

    let catalog = Catalog::resolve(&config.binary)
        .await
        .context("resolving the worker's source catalog")?;

    let fs = LocalFs::new();
    let parser = JobParser::new(&catalog, &fs).with_options(config.parse_options());
    let mut work: Vec<WorkDescriptor> = Vec::with_capacity(jobs.len());
    for tokens in &jobs {
        let descriptor = parser
            .parse(tokens)
            .await
            .with_context(|| format!("invalid job: {}", tokens.join(" ")))?;
        work.push(descriptor);
    }

    let runner = Arc::new(ProcessRunner::new(&config.binary));
    let dispatcher = Dispatcher::start(config, runner);
    for descriptor in &work {
        dispatcher.dispatch(descriptor).await?;
    }
    let summary = dispatcher.finish().await?;

    report(&summary);
    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn report(summary: &Summary) {
    tracing::info!(
        invocations = summary.invocations,
        succeeded = summary.succeeded,
        splits = summary.splits,
        retries = summary.retries,
        elapsed = ?summary.elapsed,
        "run complete"
    );
    if summary.is_success() {
        return;
    }
    for failure in &summary.failures {
        eprintln!("failed: {} ({})", failure.source, failure.class);
    }
    eprintln!("{} failures", summary.failures.len());
}
