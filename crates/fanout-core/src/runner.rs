//! Units of work and the runners that execute them.
//!
//! A [`Unit`] is one worker-binary invocation: a batch of sources sharing a
//! job's flags. A [`Runner`] executes a unit and always produces an
//! [`Outcome`]; launch failures are failed outcomes, not errors.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use crate::job::Flag;
use crate::router::ResourceClass;

/// Argument separating the worker's flags from its sources.
pub const SOURCE_SELECTOR: &str = "-s";

/// One worker-binary invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub sources: Vec<String>,
    /// Shared with every other unit cut from the same job.
    pub flags: Arc<[Flag]>,
    pub class: ResourceClass,
    /// Set on the single-source units produced by splitting a failed batch.
    pub retry: bool,
}

impl Unit {
    pub fn new(sources: Vec<String>, flags: Arc<[Flag]>, class: ResourceClass) -> Self {
        Self {
            sources,
            flags,
            class,
            retry: false,
        }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Arguments for the worker: flags, then [`SOURCE_SELECTOR`], then sources.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.flags.len() * 2 + 1 + self.sources.len());
        args.extend(self.flags.iter().flat_map(Flag::to_args));
        args.push(SOURCE_SELECTOR.to_string());
        args.extend(self.sources.iter().cloned());
        args
    }

    /// `binary` followed by [`Unit::args`], space-separated, for logs.
    pub fn command_line(&self, binary: &str) -> String {
        let mut line = binary.to_string();
        for arg in self.args() {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }

    /// One retry unit per source, keeping flags and lane.
    pub fn split(&self) -> Vec<Unit> {
        self.sources
            .iter()
            .map(|source| Unit {
                sources: vec![source.clone()],
                flags: Arc::clone(&self.flags),
                class: self.class,
                retry: true,
            })
            .collect()
    }
}

/// Result of running one unit.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub unit: Unit,
    pub success: bool,
    /// Exit status when the process ran to completion.
    pub exit_code: Option<i32>,
    /// Combined captured output, or a description of why nothing ran.
    pub output: String,
    pub elapsed: Duration,
}

impl Outcome {
    pub fn succeeded(unit: Unit, output: String, elapsed: Duration) -> Self {
        Self {
            unit,
            success: true,
            exit_code: Some(0),
            output,
            elapsed,
        }
    }

    pub fn failed(unit: Unit, exit_code: Option<i32>, output: String, elapsed: Duration) -> Self {
        Self {
            unit,
            success: false,
            exit_code,
            output,
            elapsed,
        }
    }
}

/// Executes units.
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Run `unit` to completion. Must not fail: every problem is an [`Outcome`].
    async fn run(&self, unit: &Unit) -> Outcome;
}

/// Runs units by spawning the worker binary.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    binary: PathBuf,
}

impl ProcessRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    #[tracing::instrument(level = "trace", skip_all, fields(class = %unit.class, sources = unit.len()))]
    async fn run(&self, unit: &Unit) -> Outcome {
        let started = Instant::now();
        let result = Command::new(&self.binary)
            .args(unit.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        match result {
            Ok(output) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                if output.status.success() {
                    Outcome::succeeded(unit.clone(), combined, started.elapsed())
                } else {
                    Outcome::failed(
                        unit.clone(),
                        output.status.code(),
                        combined,
                        started.elapsed(),
                    )
                }
            }
            Err(e) => Outcome::failed(
                unit.clone(),
                None,
                format!("failed to launch {}: {e}", self.binary.display()),
                started.elapsed(),
            ),
        }
    }
}
