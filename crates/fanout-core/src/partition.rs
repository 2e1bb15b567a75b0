//! Batching a job's sources into units.
//!
//! Sources are cut into consecutive batches of `ceil(N / limit)`, so a lane
//! with `limit` workers receives at most `limit` units per job and every
//! worker gets a batch when there are enough sources.

use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::job::Flag;
use crate::router::ResourceClass;
use crate::runner::Unit;

/// Sources per unit for `len` sources over `limit` workers.
pub fn batch_size(len: usize, limit: usize) -> usize {
    len.div_ceil(limit.max(1))
}

/// Cut `sources` into units for the `class` lane. No sources, no units.
pub fn partition(
    sources: Vec<String>,
    flags: Arc<[Flag]>,
    class: ResourceClass,
    limit: usize,
) -> Vec<Unit> {
    let size = batch_size(sources.len(), limit);
    if size == 0 {
        return Vec::new();
    }
    sources
        .chunks(size)
        .map(|batch| Unit::new(batch.to_vec(), Arc::clone(&flags), class))
        .collect()
}

/// Shuffle in place to spread expensive sources across units.
pub fn shuffle_sources(sources: &mut [String]) {
    sources.shuffle(&mut rand::thread_rng());
}
