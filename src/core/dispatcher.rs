//! Dispatch loop: drains the delivery queue and applies the retry policy.
//!
//! Backoff never blocks the loop. A failed job is handed to a timer task
//! spawned through [`Spawn`] which re-admits it once the backoff elapses,
//! while the loop goes straight on to the next ready job.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{Deliver, DeliveryQueue, Job, SchedulerError, Spawn};

/// Sleep between polls of an empty queue.
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(100);
/// Failed attempts after which a job is dead-lettered.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Backoff grows by this much per failed attempt.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_secs(2 * 60);

/// What to do with a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-admit after the given backoff.
    Retry(Duration),
    /// Move to the dead-letter list.
    DeadLetter,
}

/// Retry ceiling and linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempt ceiling; reaching it dead-letters the job.
    pub max_attempts: u32,
    /// Backoff is `retry_count * backoff_step`.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }
}

impl RetryPolicy {
    /// Decide given the already-incremented retry count.
    pub fn decide(&self, retry_count: u32) -> RetryDecision {
        if retry_count < self.max_attempts {
            RetryDecision::Retry(self.backoff_step * retry_count)
        } else {
            RetryDecision::DeadLetter
        }
    }
}

/// Result of one dispatch iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Queue was empty.
    Idle,
    /// Delivered; the job is discarded.
    Delivered {
        /// Identifier assigned by the destination.
        destination_id: String,
    },
    /// Delivery failed and a delayed re-admission was scheduled.
    RetryScheduled {
        /// Retry count carried by the re-admitted job.
        retry_count: u32,
        /// Backoff before re-admission.
        delay: Duration,
    },
    /// Delivery failed for the last time; job moved to the dead-letter list.
    DeadLettered,
    /// The job could not be decoded or parked and was dropped.
    Dropped,
}

/// Counters shared by dispatch loops and their re-admission timers.
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    failed_attempts: AtomicU64,
    retries_scheduled: AtomicU64,
    dead_lettered: AtomicU64,
    dropped_malformed: AtomicU64,
    requeue_failures: AtomicU64,
    pending_retries: AtomicUsize,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSnapshot {
    /// Successful deliveries.
    pub delivered: u64,
    /// Failed delivery attempts.
    pub failed_attempts: u64,
    /// Delayed re-admissions scheduled.
    pub retries_scheduled: u64,
    /// Jobs moved to the dead-letter list.
    pub dead_lettered: u64,
    /// Queue members dropped because they did not decode.
    pub dropped_malformed: u64,
    /// Jobs lost because re-admission or dead-lettering failed.
    pub requeue_failures: u64,
    /// Re-admission timers still waiting.
    pub pending_retries: usize,
}

impl DispatchStats {
    /// Read all counters.
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            retries_scheduled: self.retries_scheduled.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            requeue_failures: self.requeue_failures.load(Ordering::Relaxed),
            pending_retries: self.pending_retries.load(Ordering::Acquire),
        }
    }

    /// Re-admission timers still waiting.
    pub fn pending_retries(&self) -> usize {
        self.pending_retries.load(Ordering::Acquire)
    }
}

/// Consumer half of the pipeline.
///
/// Several loops may share one queue; the queue's atomic extraction keeps
/// them from receiving the same job.
pub struct DispatchLoop<Q: ?Sized, S> {
    name: String,
    queue: Arc<Q>,
    deliverer: Arc<dyn Deliver>,
    spawner: S,
    policy: RetryPolicy,
    idle_wait: Duration,
    stats: Arc<DispatchStats>,
}

impl<Q, S> DispatchLoop<Q, S>
where
    Q: DeliveryQueue + ?Sized + 'static,
    S: Spawn,
{
    /// Create a loop with the default retry policy and idle wait.
    pub fn new(queue: Arc<Q>, deliverer: Arc<dyn Deliver>, spawner: S) -> Self {
        Self {
            name: "dispatcher".into(),
            queue,
            deliverer,
            spawner,
            policy: RetryPolicy::default(),
            idle_wait: DEFAULT_IDLE_WAIT,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    /// Name used in log fields.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the empty-queue sleep.
    #[must_use]
    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    /// Share counters with other loops.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<DispatchStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Counters for this loop.
    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Drain the queue until `cancel` fires.
    ///
    /// Cancellation is observed between iterations and during idle waits;
    /// an in-flight delivery is allowed to finish.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(dispatcher = %self.name, "dispatch loop starting");
        while !cancel.is_cancelled() {
            let idle = match self.dispatch_next(&cancel).await {
                Ok(outcome) => outcome == DispatchOutcome::Idle,
                Err(e) => {
                    error!(dispatcher = %self.name, error = %e, "failed to pop from queue");
                    true
                }
            };
            if idle {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(self.idle_wait) => {}
                }
            }
        }
        info!(dispatcher = %self.name, "dispatch loop stopping");
    }

    /// Extract and attempt one job.
    ///
    /// Only a failed extraction is returned as an error; everything that
    /// happens to an extracted job is contained in the outcome.
    pub async fn dispatch_next(
        &self,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, SchedulerError> {
        let Some(raw) = self.queue.extract_highest().await? else {
            return Ok(DispatchOutcome::Idle);
        };

        let mut job = match Job::decode(&raw) {
            Ok(job) => job,
            Err(e) => {
                self.stats.dropped_malformed.fetch_add(1, Ordering::Relaxed);
                error!(dispatcher = %self.name, error = %e, "failed to decode job, dropping");
                return Ok(DispatchOutcome::Dropped);
            }
        };

        match self.deliverer.deliver(&job).await {
            Ok(destination_id) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                info!(
                    dispatcher = %self.name,
                    post_id = %job.post_id,
                    platform = %job.platform,
                    destination_id = %destination_id,
                    "job delivered"
                );
                Ok(DispatchOutcome::Delivered { destination_id })
            }
            Err(err) => {
                self.stats.failed_attempts.fetch_add(1, Ordering::Relaxed);
                job.retry_count += 1;
                warn!(
                    dispatcher = %self.name,
                    post_id = %job.post_id,
                    platform = %job.platform,
                    retry_count = job.retry_count,
                    error = %err,
                    "failed to publish post"
                );
                Ok(self.handle_failure(job, cancel).await)
            }
        }
    }

    async fn handle_failure(&self, job: Job, cancel: &CancellationToken) -> DispatchOutcome {
        match self.policy.decide(job.retry_count) {
            RetryDecision::Retry(delay) => {
                let retry_count = job.retry_count;
                self.schedule_readmission(job, delay, cancel.clone());
                DispatchOutcome::RetryScheduled { retry_count, delay }
            }
            RetryDecision::DeadLetter => match self.queue.dead_letter(&job).await {
                Ok(()) => {
                    self.stats.dead_lettered.fetch_add(1, Ordering::Relaxed);
                    error!(
                        post_id = %job.post_id,
                        platform_config_id = %job.platform_config_id,
                        retry_count = job.retry_count,
                        "retries exhausted, job dead-lettered"
                    );
                    DispatchOutcome::DeadLettered
                }
                Err(e) => {
                    self.stats.requeue_failures.fetch_add(1, Ordering::Relaxed);
                    error!(post_id = %job.post_id, error = %e, "failed to dead-letter job");
                    DispatchOutcome::Dropped
                }
            },
        }
    }

    fn schedule_readmission(&self, job: Job, delay: Duration, cancel: CancellationToken) {
        let queue = Arc::clone(&self.queue);
        let stats = Arc::clone(&self.stats);
        stats.retries_scheduled.fetch_add(1, Ordering::Relaxed);
        stats.pending_retries.fetch_add(1, Ordering::AcqRel);
        debug!(post_id = %job.post_id, delay_secs = delay.as_secs(), "re-admission scheduled");

        self.spawner.spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                // Park the job in the queue now rather than lose it at shutdown.
                () = cancel.cancelled() => debug!(post_id = %job.post_id, "shutdown during backoff, re-admitting early"),
            }
            if let Err(e) = queue.admit(&job).await {
                stats.requeue_failures.fetch_add(1, Ordering::Relaxed);
                error!(post_id = %job.post_id, error = %e, "failed to re-admit job");
            }
            stats.pending_retries.fetch_sub(1, Ordering::AcqRel);
        });
    }
}
