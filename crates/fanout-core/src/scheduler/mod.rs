//! Scheduler: lane worker pools, result aggregation, and retry splitting.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          Dispatcher                               │
//! │                                                                   │
//! │  dispatch(job) ──partition──▶ Submitter::submit ──┬──▶ cpu queue  │
//! │                                  ▲   (tracker +1) └──▶ gpu queue  │
//! │                                  │                       │        │
//! │                                  │ retries          N workers     │
//! │                                  │                 per lane       │
//! │                           ┌──────┴──────┐                │        │
//! │                           │ Aggregator  │◀── outcomes ───┘        │
//! │                           │ (tracker -1)│   (unbounded)           │
//! │                           └─────────────┘                         │
//! │                                                                   │
//! │  finish(): wait for tracker == 0, stop aggregator, close queues,  │
//! │            join workers → Summary                                 │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every unit is counted by the [`CompletionTracker`] before it is queued
//! and resolved only after its outcome is recorded and any retries it
//! spawned have been counted. The count can therefore only reach zero once
//! no work remains anywhere.
//!
//! Workers never wait on anything but their own queue and the runner, so
//! a full queue only ever blocks the submitter, which the workers keep
//! draining.

mod aggregator;
mod dispatcher;
mod pool;
mod tracker;

pub use aggregator::{Aggregator, Failure, Summary};
pub use dispatcher::{DispatchError, Dispatcher, Submitter};
pub use pool::WorkerPool;
pub use tracker::CompletionTracker;
