//! fanout-core: resolve jobs, batch their sources, and run them across
//! CPU and GPU worker pools with automatic retry splitting.
//!
//! The flow for one run:
//!
//! 1. [`Catalog::resolve`] asks the worker binary for its built-in names.
//! 2. [`JobParser`] turns each job's tokens into a [`WorkDescriptor`].
//! 3. [`Dispatcher::dispatch`] routes each descriptor to a lane, shuffles
//!    and batches its sources into [`Unit`]s, and queues them.
//! 4. Workers run units through a [`Runner`]; failed batches come back as
//!    single-source retries.
//! 5. [`Dispatcher::finish`] waits for every unit and returns a [`Summary`].

pub mod catalog;
pub mod config;
pub mod job;
pub mod local_fs;
pub mod partition;
pub mod router;
pub mod runner;
pub mod scheduler;
pub mod sources;

pub use catalog::{Catalog, CatalogError};
pub use config::{DispatchConfig, LaneConfig};
pub use job::{Flag, JobParser, ParseError, ParseOptions, WorkDescriptor};
pub use local_fs::LocalFs;
pub use router::{ResourceClass, route};
pub use runner::{Outcome, ProcessRunner, Runner, Unit};
pub use scheduler::{DispatchError, Dispatcher, Failure, Summary};
