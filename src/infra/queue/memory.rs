//! In-memory delivery queue with score ordering and atomic extraction.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{DeliveryQueue, Job, JobKey, SchedulerError};

/// Heap entry ordered by score (highest first), FIFO within equal scores.
#[derive(Debug)]
pub(crate) struct ScoredEntry {
    pub(crate) score: i64,
    pub(crate) seq: u64,
    pub(crate) member: String,
}

impl PartialEq for ScoredEntry {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl Eq for ScoredEntry {}

impl PartialOrd for ScoredEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earlier insertion wins ties (reversed for max-heap).
        self.score
            .cmp(&other.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct State {
    live: BinaryHeap<ScoredEntry>,
    next_seq: u64,
    dead: Vec<Job>,
    claims: HashMap<JobKey, Instant>,
}

impl State {
    fn push(&mut self, score: i64, member: String) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.push(ScoredEntry { score, seq, member });
    }
}

/// Delivery queue held in process memory.
///
/// One mutex guards the heap, so extraction is atomic for any number of
/// dispatchers. Nothing survives a restart; use it for tests and local runs.
#[derive(Default)]
pub struct InMemoryDeliveryQueue {
    state: Mutex<State>,
}

impl InMemoryDeliveryQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw member at an explicit score, bypassing job encoding.
    pub fn push_raw(&self, score: i64, member: impl Into<String>) {
        self.state.lock().push(score, member.into());
    }
}

#[async_trait]
impl DeliveryQueue for InMemoryDeliveryQueue {
    async fn admit(&self, job: &Job) -> Result<(), SchedulerError> {
        let member = job.encode()?;
        self.state.lock().push(job.score(), member);
        Ok(())
    }

    async fn extract_highest(&self) -> Result<Option<String>, SchedulerError> {
        Ok(self.state.lock().live.pop().map(|entry| entry.member))
    }

    async fn dead_letter(&self, job: &Job) -> Result<(), SchedulerError> {
        self.state.lock().dead.push(job.clone());
        Ok(())
    }

    async fn claim(&self, key: &JobKey, ttl: Duration) -> Result<bool, SchedulerError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.claims.retain(|_, expires| *expires > now);
        if state.claims.contains_key(key) {
            return Ok(false);
        }
        state.claims.insert(key.clone(), now + ttl);
        Ok(true)
    }

    async fn release(&self, key: &JobKey) -> Result<(), SchedulerError> {
        self.state.lock().claims.remove(key);
        Ok(())
    }

    async fn len(&self) -> Result<usize, SchedulerError> {
        Ok(self.state.lock().live.len())
    }

    async fn dead_letters(&self) -> Result<Vec<Job>, SchedulerError> {
        Ok(self.state.lock().dead.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::core::{Platform, Priority};

    fn make_job(id: &str, priority: Priority, secs: i64) -> Job {
        Job {
            post_id: id.into(),
            platform_config_id: format!("{id}-cfg"),
            platform: Platform::Meta,
            account_id: "acct".into(),
            content: format!("post {id}"),
            media_urls: Vec::new(),
            hashtags: Vec::new(),
            scheduled_at: Utc.timestamp_opt(secs, 0).unwrap(),
            priority,
            retry_count: 0,
        }
    }

    async fn pop_id(q: &InMemoryDeliveryQueue) -> String {
        let raw = q.extract_highest().await.unwrap().unwrap();
        Job::decode(&raw).unwrap().post_id
    }

    #[tokio::test]
    async fn test_priority_ordering() {
        let q = InMemoryDeliveryQueue::new();

        q.admit(&make_job("1", Priority::Low, 100)).await.unwrap();
        q.admit(&make_job("2", Priority::High, 900)).await.unwrap();
        q.admit(&make_job("3", Priority::Normal, 300)).await.unwrap();

        assert_eq!(pop_id(&q).await, "2");
        assert_eq!(pop_id(&q).await, "3");
        assert_eq!(pop_id(&q).await, "1");
    }

    #[tokio::test]
    async fn test_earliest_first_within_priority() {
        let q = InMemoryDeliveryQueue::new();

        q.admit(&make_job("1", Priority::Normal, 300)).await.unwrap();
        q.admit(&make_job("2", Priority::Normal, 100)).await.unwrap();
        q.admit(&make_job("3", Priority::Normal, 200)).await.unwrap();

        assert_eq!(pop_id(&q).await, "2");
        assert_eq!(pop_id(&q).await, "3");
        assert_eq!(pop_id(&q).await, "1");
    }

    #[tokio::test]
    async fn test_fifo_on_equal_score() {
        let q = InMemoryDeliveryQueue::new();
        q.admit(&make_job("a", Priority::Low, 500)).await.unwrap();
        q.admit(&make_job("b", Priority::Low, 500)).await.unwrap();

        assert_eq!(pop_id(&q).await, "a");
        assert_eq!(pop_id(&q).await, "b");
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let q = InMemoryDeliveryQueue::new();
        assert!(q.extract_highest().await.unwrap().is_none());
        assert!(q.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_dead_letters_keep_failure_order() {
        let q = InMemoryDeliveryQueue::new();
        q.dead_letter(&make_job("x", Priority::High, 1)).await.unwrap();
        q.dead_letter(&make_job("y", Priority::Low, 2)).await.unwrap();

        let dead = q.dead_letters().await.unwrap();
        assert_eq!(dead.iter().map(|j| j.post_id.as_str()).collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(q.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_claim_is_exclusive_until_released() {
        let q = InMemoryDeliveryQueue::new();
        let key = make_job("p", Priority::Low, 1).key();

        assert!(q.claim(&key, Duration::from_secs(60)).await.unwrap());
        assert!(!q.claim(&key, Duration::from_secs(60)).await.unwrap());

        q.release(&key).await.unwrap();
        assert!(q.claim(&key, Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_expires() {
        let q = InMemoryDeliveryQueue::new();
        let key = make_job("p", Priority::Low, 1).key();

        assert!(q.claim(&key, Duration::ZERO).await.unwrap());
        assert!(q.claim(&key, Duration::from_secs(60)).await.unwrap());
    }
}
