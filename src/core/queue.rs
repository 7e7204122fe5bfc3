//! Delivery queue abstraction shared by the admission poller and dispatch loops.

use std::time::Duration;

use async_trait::async_trait;

use super::{Job, JobKey, SchedulerError};

/// Durable, score-ordered store of admitted jobs plus a terminal dead-letter list.
///
/// The poller and the dispatchers communicate only through this trait.
/// Implementations must make [`extract_highest`](Self::extract_highest)
/// atomic: concurrent callers never receive the same entry.
///
/// A job handed out by `extract_highest` lives only in the caller's memory
/// until it is re-admitted or dead-lettered; a crash in between loses it.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    /// Insert a job at its score ([`Job::score`]).
    async fn admit(&self, job: &Job) -> Result<(), SchedulerError>;

    /// Remove and return the raw member with the highest score, or `None` when empty.
    ///
    /// The member is returned undecoded so the caller decides what to do
    /// with a malformed payload.
    async fn extract_highest(&self) -> Result<Option<String>, SchedulerError>;

    /// Append a job to the dead-letter list. Never replayed.
    async fn dead_letter(&self, job: &Job) -> Result<(), SchedulerError>;

    /// Atomically mark `key` as admitted for `ttl`.
    ///
    /// Returns `false` when a live claim already exists.
    async fn claim(&self, key: &JobKey, ttl: Duration) -> Result<bool, SchedulerError>;

    /// Drop the claim on `key`, if any.
    async fn release(&self, key: &JobKey) -> Result<(), SchedulerError>;

    /// Number of jobs waiting in the live queue.
    async fn len(&self) -> Result<usize, SchedulerError>;

    /// Whether the live queue is empty.
    async fn is_empty(&self) -> Result<bool, SchedulerError> {
        Ok(self.len().await? == 0)
    }

    /// Dead-lettered jobs, in failure order.
    async fn dead_letters(&self) -> Result<Vec<Job>, SchedulerError>;
}
