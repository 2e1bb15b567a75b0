//! The dispatcher: owns the lanes, the aggregator, and shutdown ordering.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::DispatchConfig;
use crate::job::{Flag, WorkDescriptor};
use crate::partition::{partition, shuffle_sources};
use crate::router::{ResourceClass, route};
use crate::runner::{Outcome, Runner, Unit};

use super::aggregator::{Aggregator, Summary};
use super::pool::WorkerPool;
use super::tracker::CompletionTracker;

/// Errors from dispatching work.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0} queue is closed")]
    QueueClosed(ResourceClass),
    #[error("aggregator task failed: {0}")]
    Aggregator(String),
}

/// The single path by which units reach a lane queue.
///
/// Counts each unit before queueing it, so the tracker can never observe
/// zero while a unit is in flight.
#[derive(Debug, Clone)]
pub struct Submitter {
    cpu: mpsc::Sender<Unit>,
    gpu: mpsc::Sender<Unit>,
    tracker: Arc<CompletionTracker>,
}

impl Submitter {
    /// Queue `unit` on its lane, waiting for space.
    pub async fn submit(&self, unit: Unit) -> Result<(), DispatchError> {
        self.enqueue(unit)
            .await
            .map_err(|rejected| DispatchError::QueueClosed(rejected.class))
    }

    /// Like [`submit`](Self::submit), but hands back a unit the lane refused.
    async fn enqueue(&self, unit: Unit) -> Result<(), Unit> {
        self.tracker.add(1);
        let queue = match unit.class {
            ResourceClass::Cpu => &self.cpu,
            ResourceClass::Gpu => &self.gpu,
        };
        if let Err(rejected) = queue.send(unit).await {
            self.tracker.resolve();
            return Err(rejected.0);
        }
        Ok(())
    }
}

/// Runs work descriptors across the CPU and GPU lanes.
///
/// ```ignore
/// let dispatcher = Dispatcher::start(config, Arc::new(ProcessRunner::new(&binary)));
/// for work in &jobs {
///     dispatcher.dispatch(work).await?;
/// }
/// let summary = dispatcher.finish().await?;
/// ```
pub struct Dispatcher {
    config: DispatchConfig,
    submitter: Submitter,
    tracker: Arc<CompletionTracker>,
    pools: Vec<WorkerPool>,
    aggregator: JoinHandle<Aggregator>,
    shutdown: CancellationToken,
    started: Instant,
}

impl Dispatcher {
    /// Start both lanes and the aggregator. Must be called inside a runtime.
    pub fn start(config: DispatchConfig, runner: Arc<dyn Runner>) -> Self {
        let tracker = Arc::new(CompletionTracker::new());
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let (cpu_pool, cpu) = WorkerPool::spawn(
            ResourceClass::Cpu,
            config.cpu,
            Arc::clone(&runner),
            outcome_tx.clone(),
        );
        let (gpu_pool, gpu) =
            WorkerPool::spawn(ResourceClass::Gpu, config.gpu, runner, outcome_tx);

        let submitter = Submitter {
            cpu,
            gpu,
            tracker: Arc::clone(&tracker),
        };
        let shutdown = CancellationToken::new();
        let aggregator = tokio::spawn(aggregate(
            Aggregator::new(&config.binary, config.quiet),
            outcome_rx,
            submitter.clone(),
            Arc::clone(&tracker),
            shutdown.clone(),
        ));

        tracing::info!(
            binary = %config.binary.display(),
            cpu_workers = cpu_pool.size(),
            gpu_workers = gpu_pool.size(),
            "dispatcher started"
        );

        Self {
            config,
            submitter,
            tracker,
            pools: vec![cpu_pool, gpu_pool],
            aggregator,
            shutdown,
            started: Instant::now(),
        }
    }

    /// Route, batch, and queue one job. Returns the number of units queued.
    ///
    /// Waits only for queue space; completion is awaited by [`finish`](Self::finish).
    #[tracing::instrument(level = "debug", skip_all, fields(sources = work.sources.len()))]
    pub async fn dispatch(&self, work: &WorkDescriptor) -> Result<usize, DispatchError> {
        if work.is_empty() {
            tracing::debug!("job names no sources; nothing to dispatch");
            return Ok(0);
        }

        let class = route(&work.flags);
        let lane = self.config.lane(class);

        let mut sources = work.sources.clone();
        if self.config.shuffle {
            shuffle_sources(&mut sources);
        }
        let flags: Arc<[Flag]> = work.flags.clone().into();
        let units = partition(sources, flags, class, lane.limit);
        let count = units.len();

        tracing::debug!(%class, units = count, "dispatching job");
        for unit in units {
            self.submitter.submit(unit).await?;
        }
        Ok(count)
    }

    /// Units submitted and not yet resolved, retries included.
    pub fn outstanding(&self) -> usize {
        self.tracker.outstanding()
    }

    /// Wait for all work, including retries, then shut everything down.
    pub async fn finish(self) -> Result<Summary, DispatchError> {
        let Self {
            submitter,
            tracker,
            pools,
            aggregator,
            shutdown,
            started,
            ..
        } = self;

        tracker.wait_drained().await;
        shutdown.cancel();
        let aggregator = aggregator
            .await
            .map_err(|e| DispatchError::Aggregator(e.to_string()))?;

        // With the aggregator's submitter gone, dropping ours closes the queues.
        drop(submitter);
        for pool in pools {
            pool.join().await;
        }

        let mut summary = aggregator.into_summary();
        summary.elapsed = started.elapsed();
        tracing::debug!(
            invocations = summary.invocations,
            failures = summary.failures.len(),
            "dispatcher finished"
        );
        Ok(summary)
    }
}

/// Aggregator task: record each outcome, queue its retries, then resolve it.
async fn aggregate(
    mut aggregator: Aggregator,
    mut outcomes: mpsc::UnboundedReceiver<Outcome>,
    submitter: Submitter,
    tracker: Arc<CompletionTracker>,
    shutdown: CancellationToken,
) -> Aggregator {
    loop {
        let outcome = tokio::select! {
            biased;
            outcome = outcomes.recv() => match outcome {
                Some(outcome) => outcome,
                None => break,
            },
            () = shutdown.cancelled() => break,
        };

        for retry in aggregator.record(outcome) {
            if let Err(rejected) = submitter.enqueue(retry).await {
                aggregator.abandon(rejected);
            }
        }
        // Retries are counted by now, so this cannot reach zero early.
        tracker.resolve();
    }
    aggregator
}
