//! Fixed-size worker pool draining one lane's queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::config::LaneConfig;
use crate::router::ResourceClass;
use crate::runner::{Outcome, Runner, Unit};

/// The workers serving one resource class.
pub struct WorkerPool {
    class: ResourceClass,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `lane.limit` workers and return the pool with its queue's sender.
    ///
    /// Workers exit once every sender is dropped and the queue is empty.
    pub fn spawn(
        class: ResourceClass,
        lane: LaneConfig,
        runner: Arc<dyn Runner>,
        outcomes: mpsc::UnboundedSender<Outcome>,
    ) -> (Self, mpsc::Sender<Unit>) {
        let (queue_tx, queue_rx) = mpsc::channel(lane.queue_depth.max(1));
        let queue = Arc::new(Mutex::new(queue_rx));

        let workers = (0..lane.limit.max(1))
            .map(|index| {
                tokio::spawn(work(
                    class,
                    index,
                    Arc::clone(&queue),
                    Arc::clone(&runner),
                    outcomes.clone(),
                ))
            })
            .collect();

        tracing::debug!(%class, workers = lane.limit, queue_depth = lane.queue_depth, "lane started");
        (Self { class, workers }, queue_tx)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(class = %self.class, error = %e, "worker task failed");
            }
        }
    }
}

async fn work(
    class: ResourceClass,
    index: usize,
    queue: Arc<Mutex<mpsc::Receiver<Unit>>>,
    runner: Arc<dyn Runner>,
    outcomes: mpsc::UnboundedSender<Outcome>,
) {
    loop {
        // The lock is held only while waiting for the next unit.
        let next = queue.lock().await.recv().await;
        let Some(unit) = next else {
            break;
        };

        tracing::trace!(%class, worker = index, sources = unit.len(), "running unit");
        let outcome = run_isolated(&runner, unit).await;
        if outcomes.send(outcome).is_err() {
            tracing::warn!(%class, worker = index, "outcome receiver gone; stopping worker");
            break;
        }
    }
    tracing::trace!(%class, worker = index, "worker exiting");
}

/// Run on a separate task so a panicking runner becomes a failed outcome.
async fn run_isolated(runner: &Arc<dyn Runner>, unit: Unit) -> Outcome {
    let task_runner = Arc::clone(runner);
    let task_unit = unit.clone();
    match tokio::spawn(async move { task_runner.run(&task_unit).await }).await {
        Ok(outcome) => outcome,
        Err(e) => Outcome::failed(unit, None, format!("runner task failed: {e}"), Duration::ZERO),
    }
}
