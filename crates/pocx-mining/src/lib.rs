//! # pocx-mining
//!
//! Forging support for the PoCX chain.
//!
//! This crate provides:
//! - The bounded nonce-submission queue with backpressure
//! - The single-worker forging scheduler: keeps the best candidate, waits
//!   out its deadline, re-evaluates on tip changes, forges exactly once
//! - Defensive forging on same-height competition
//! - Block assembly and signing over the host chain's template and the
//!   wallet's key store
//!
//! One worker owns all forging state. Submissions cross the thread
//! boundary by value through the queue; nothing else is shared.

mod builder;
mod error;
mod queue;
mod scheduler;
mod submission;

pub use builder::BlockBuilder;
pub use error::{MiningError, MiningResult};
pub use queue::{SubmissionQueue, WaitOutcome, MAX_QUEUE_SIZE};
pub use scheduler::{ForgingCandidate, Scheduler, SchedulerHandles};
pub use submission::{NonceSubmission, SubmissionValidator};
