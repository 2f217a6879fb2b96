//! The forging scheduler.
//!
//! One persistent worker owns the current-best candidate. Submissions
//! cross into the worker through the bounded queue; the worker drains it,
//! keeps the lowest-quality candidate for the current context, sleeps on
//! the queue's condvar until the candidate's forge time, and then builds,
//! signs and submits exactly one block. Tip changes observed while
//! draining may trigger defensive forging: if the network picked a block
//! we can beat at the same height, ours is published immediately so the
//! deterministic lower-quality tie-break can act.
//!
//! The candidate never leaves the worker; the queue mutex is never held
//! across a chain lookup.

use crate::builder::BlockBuilder;
use crate::queue::{SubmissionQueue, WaitOutcome};
use crate::submission::{NonceSubmission, SubmissionValidator};
use crate::{MiningError, MiningResult};
use parking_lot::Mutex;
use pocx_assignments::AssignmentView;
use pocx_chain::{BlockSink, TemplateProvider};
use pocx_consensus::{
    new_block_context, time_bent_deadline, AccountId, BlockHash, BlockSummary, ChainParams,
    ChainView, PlotSeed,
};
use pocx_wallet::{BlockSigner, WalletError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Heartbeat wait while no candidate is armed.
const IDLE_WAIT: Duration = Duration::from_secs(30);

/// The worker's current best submission plus the context it was accepted
/// under. Exclusively owned by the worker.
#[derive(Debug, Clone)]
pub struct ForgingCandidate {
    pub account_id: AccountId,
    pub seed: PlotSeed,
    pub nonce: u64,
    pub quality: u64,
    pub compression: u32,
    /// Time-bent deadline in seconds.
    pub deadline_secs: u64,
    pub base_target: u64,
    /// Timestamp of the previous block.
    pub block_time: i64,
    pub generation_signature: [u8; 32],
    /// Height this candidate would forge at.
    pub height: i32,
    /// Tip the candidate was accepted on, for reorg detection.
    pub tip_block_hash: BlockHash,
    /// Wall-clock moment the deadline expires.
    pub forge_time: SystemTime,
    /// Set when the candidate was superseded or its forge was aborted.
    pub cancelled: bool,
}

/// Everything the worker consumes from the rest of the node.
#[derive(Clone)]
pub struct SchedulerHandles {
    pub chain: Arc<dyn ChainView>,
    pub assignments: Arc<dyn AssignmentView>,
    pub templates: Arc<dyn TemplateProvider>,
    pub sink: Arc<dyn BlockSink>,
    pub signer: Arc<dyn BlockSigner>,
    pub params: ChainParams,
}

/// Queue-based forging scheduler. Process-wide singleton with explicit
/// start and shutdown; construct it eagerly at node start.
pub struct Scheduler {
    queue: Arc<SubmissionQueue>,
    shutdown: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Spawn the worker thread.
    pub fn start(handles: SchedulerHandles) -> Self {
        let queue = Arc::new(SubmissionQueue::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = {
            let queue = Arc::clone(&queue);
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("pocx-forger".to_string())
                .spawn(move || Worker::new(handles, queue, shutdown).run())
                .expect("failed to spawn forging worker thread")
        };
        info!("forging scheduler started");

        Self {
            queue,
            shutdown,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue a nonce submission. Returns `false` when the queue is full or
    /// the scheduler is shutting down.
    pub fn submit_nonce(&self, submission: NonceSubmission) -> bool {
        if self.shutdown.load(Ordering::SeqCst) {
            return false;
        }
        self.queue.submit(submission)
    }

    /// Pending submissions.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Stop the worker and wait for it to exit. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("shutting down forging scheduler");
        self.queue.close();
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!("forging worker panicked during shutdown");
            }
        }
        info!("forging scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    handles: SchedulerHandles,
    queue: Arc<SubmissionQueue>,
    shutdown: Arc<AtomicBool>,
    builder: BlockBuilder,
    candidate: Option<ForgingCandidate>,
}

impl Worker {
    fn new(handles: SchedulerHandles, queue: Arc<SubmissionQueue>, shutdown: Arc<AtomicBool>) -> Self {
        let builder = BlockBuilder::new(
            Arc::clone(&handles.templates),
            Arc::clone(&handles.assignments),
            Arc::clone(&handles.signer),
        );
        Self {
            handles,
            queue,
            shutdown,
            builder,
            candidate: None,
        }
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn run(mut self) {
        while !self.stopping() {
            if let Some(submission) = self.queue.pop() {
                self.process_submission(submission);
                continue;
            }

            let armed = matches!(&self.candidate, Some(c) if !c.cancelled);
            if armed {
                self.wait_for_deadline_or_submission();
            } else {
                self.queue.wait_idle(IDLE_WAIT);
            }
        }
        info!("forging worker stopped");
    }

    /// Step 1 of the per-tick logic: rank one drained submission against
    /// the current candidate and context.
    fn process_submission(&mut self, submission: NonceSubmission) {
        let Some(tip) = self.handles.chain.tip() else {
            return;
        };

        // A tip change invalidates the candidate's context, but may first
        // call for a defensive forge against the arriving block.
        let tip_changed = self
            .candidate
            .as_ref()
            .is_some_and(|candidate| candidate.tip_block_hash != tip.hash);
        if tip_changed {
            self.check_defensive_forging(&tip);
            self.candidate = None;
        }

        let ctx = match new_block_context(self.handles.chain.as_ref(), &self.handles.params) {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        if !SubmissionValidator::validate_context(&submission, ctx.height, &ctx.generation_signature)
        {
            debug!(
                expected_height = ctx.height,
                submitted_height = submission.expected_height,
                "stale submission dropped"
            );
            return;
        }

        let current_quality = self.candidate.as_ref().map(|c| c.quality);
        if !SubmissionValidator::is_better_than_current(submission.quality, current_quality) {
            debug!(
                quality = submission.quality,
                current = ?current_quality,
                "submission not better than current candidate"
            );
            return;
        }

        let deadline_secs = time_bent_deadline(
            submission.quality,
            ctx.base_target,
            self.handles.params.target_spacing_secs,
        );

        if let Some(old) = &mut self.candidate {
            old.cancelled = true;
        }

        let forge_time =
            UNIX_EPOCH + Duration::from_secs((tip.time as u64).saturating_add(deadline_secs));
        info!(
            account = %submission.account_id,
            nonce = submission.nonce,
            quality = submission.quality,
            deadline_secs,
            height = ctx.height,
            "forging candidate installed"
        );
        self.candidate = Some(ForgingCandidate {
            account_id: submission.account_id,
            seed: submission.seed,
            nonce: submission.nonce,
            quality: submission.quality,
            compression: submission.compression,
            deadline_secs,
            base_target: ctx.base_target,
            block_time: tip.time,
            generation_signature: ctx.generation_signature,
            height: ctx.height,
            tip_block_hash: tip.hash,
            forge_time,
            cancelled: false,
        });
    }

    /// Steps 2 and 3: sleep until the forge time, then re-check context
    /// and forge. Wakes early for new submissions and shutdown.
    fn wait_for_deadline_or_submission(&mut self) {
        let forge_time = match &self.candidate {
            Some(candidate) => candidate.forge_time,
            None => return,
        };

        let remaining = forge_time
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO);
        match self.queue.wait_deadline(Instant::now() + remaining) {
            WaitOutcome::Submission | WaitOutcome::Closed => return,
            WaitOutcome::TimedOut => {}
        }
        if self.stopping() {
            return;
        }

        let Some(mut candidate) = self.candidate.take() else {
            return;
        };

        let ctx = match new_block_context(self.handles.chain.as_ref(), &self.handles.params) {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        if candidate.height != ctx.height
            || candidate.generation_signature != ctx.generation_signature
        {
            debug!(height = candidate.height, "context changed, candidate abandoned");
            return;
        }

        if candidate.base_target != ctx.base_target {
            // Same round, new difficulty: re-bend the deadline and wait
            // again.
            let deadline_secs = time_bent_deadline(
                candidate.quality,
                ctx.base_target,
                self.handles.params.target_spacing_secs,
            );
            let block_time = self
                .handles
                .chain
                .tip()
                .map(|tip| tip.time)
                .unwrap_or(candidate.block_time);

            debug!(
                old_deadline = candidate.deadline_secs,
                new_deadline = deadline_secs,
                "base target changed, deadline recomputed"
            );
            candidate.deadline_secs = deadline_secs;
            candidate.base_target = ctx.base_target;
            candidate.block_time = block_time;
            candidate.forge_time = UNIX_EPOCH
                + Duration::from_secs((block_time as u64).saturating_add(deadline_secs));
            self.candidate = Some(candidate);
            return;
        }

        match self.forge_and_submit(&candidate) {
            Ok(accepted) => {
                if accepted {
                    info!(
                        deadline = candidate.deadline_secs,
                        height = candidate.height,
                        "deadline reached, block forged and accepted"
                    );
                } else {
                    warn!(height = candidate.height, "forged block was rejected");
                }
            }
            Err(MiningError::Wallet(WalletError::Locked)) => {
                // Keep the candidate so an unlock plus a queue wakeup can
                // still use it; disarm the timer to avoid a hot loop.
                warn!("wallet locked, forge aborted, candidate kept");
                candidate.cancelled = true;
                self.candidate = Some(candidate);
            }
            Err(e) => {
                warn!(error = %e, "forge failed, candidate discarded");
            }
        }
    }

    /// Publish our block when a competing block we can beat arrived at the
    /// height we were contesting.
    fn check_defensive_forging(&self, new_tip: &BlockSummary) {
        let Some(candidate) = &self.candidate else {
            return;
        };
        if new_tip.prev_hash != candidate.tip_block_hash {
            // Deeper reorg, not same-height competition.
            return;
        }
        if candidate.quality < new_tip.quality {
            info!(
                our_quality = candidate.quality,
                arriving_quality = new_tip.quality,
                height = candidate.height,
                "defensive forging against higher-quality block"
            );
            if let Err(e) = self.forge_and_submit(candidate) {
                warn!(error = %e, "defensive forge failed");
            }
        }
    }

    fn forge_and_submit(&self, candidate: &ForgingCandidate) -> MiningResult<bool> {
        let block = self.builder.build_block(candidate)?;
        Ok(self.handles.sink.submit_block(&block)?)
    }
}
