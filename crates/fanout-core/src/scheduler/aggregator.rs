//! Outcome bookkeeping, logging, and retry decisions.
//!
//! A failed multi-source unit is not reported: it is split into one retry
//! per source. Only a failed single-source unit is a real failure, and that
//! is always logged, even in quiet mode.

use std::path::Path;
use std::time::Duration;

use crate::job::Flag;
use crate::router::ResourceClass;
use crate::runner::{Outcome, Unit};

/// A source that failed on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub source: String,
    pub flags: Vec<Flag>,
    pub class: ResourceClass,
    pub exit_code: Option<i32>,
    pub output: String,
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    /// Units run, retries included.
    pub invocations: usize,
    /// Units that succeeded.
    pub succeeded: usize,
    /// Failed batches that were split into retries.
    pub splits: usize,
    /// Retry units created by splitting.
    pub retries: usize,
    pub failures: Vec<Failure>,
    pub elapsed: Duration,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Records outcomes and decides which units to rerun.
#[derive(Debug)]
pub struct Aggregator {
    binary: String,
    quiet: bool,
    summary: Summary,
}

impl Aggregator {
    pub fn new(binary: &Path, quiet: bool) -> Self {
        Self {
            binary: binary.display().to_string(),
            quiet,
            summary: Summary::default(),
        }
    }

    /// Record `outcome`, returning the units that must be resubmitted.
    pub fn record(&mut self, outcome: Outcome) -> Vec<Unit> {
        self.summary.invocations += 1;
        let Outcome {
            unit,
            success,
            exit_code,
            output,
            elapsed,
        } = outcome;

        if success {
            self.summary.succeeded += 1;
            if !self.quiet {
                tracing::info!(
                    class = %unit.class,
                    sources = unit.len(),
                    ?elapsed,
                    "{} succeeded in {:.1?}:\n{}",
                    unit.command_line(&self.binary),
                    elapsed,
                    output.trim_end(),
                );
            }
            return Vec::new();
        }

        if unit.len() > 1 {
            self.summary.splits += 1;
            self.summary.retries += unit.len();
            if !self.quiet {
                tracing::warn!(
                    class = %unit.class,
                    sources = unit.len(),
                    ?exit_code,
                    "{} failed after {:.1?}; retrying each source individually:\n{}",
                    unit.command_line(&self.binary),
                    elapsed,
                    output.trim_end(),
                );
            }
            return unit.split();
        }

        tracing::error!(
            class = %unit.class,
            ?exit_code,
            retry = unit.retry,
            "{} failed after {:.1?}:\n{}",
            unit.command_line(&self.binary),
            elapsed,
            output.trim_end(),
        );
        for source in unit.sources {
            self.summary.failures.push(Failure {
                source,
                flags: unit.flags.to_vec(),
                class: unit.class,
                exit_code,
                output: output.clone(),
            });
        }
        Vec::new()
    }

    /// Record a retry that never reached its queue. Its source counts as a
    /// failure so the run cannot report success without having run it.
    pub fn abandon(&mut self, unit: Unit) {
        tracing::error!(
            class = %unit.class,
            sources = unit.len(),
            "{} was never run: {} queue closed",
            unit.command_line(&self.binary),
            unit.class,
        );
        for source in unit.sources {
            self.summary.failures.push(Failure {
                source,
                flags: unit.flags.to_vec(),
                class: unit.class,
                exit_code: None,
                output: String::new(),
            });
        }
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn into_summary(self) -> Summary {
        self.summary
    }
}
