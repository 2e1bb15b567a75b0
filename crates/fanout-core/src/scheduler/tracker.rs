//! Outstanding-work counter.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Counts units submitted but not yet fully resolved.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    outstanding: AtomicUsize,
    drained: Notify,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `n` more units. Call before the units become visible to workers.
    pub fn add(&self, n: usize) {
        self.outstanding.fetch_add(n, Ordering::AcqRel);
    }

    /// Mark one unit resolved, waking waiters when nothing is left.
    pub fn resolve(&self) {
        match self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(1) => self.drained.notify_waiters(),
            Ok(_) => {}
            Err(_) => tracing::error!("completion tracker resolved with nothing outstanding"),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Wait until the count is zero.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a resolve in between is not lost.
            notified.as_mut().enable();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}
