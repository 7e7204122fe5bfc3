//! Redis-backed delivery queue.
//!
//! - **Live queue**: sorted set `scheduled_posts`, member = JSON job, score = [`Job::score`]
//! - **Extraction**: `ZPOPMAX key 1`, atomic on the server for any number of dispatchers
//! - **Dead letters**: list `failed_posts` (`LPUSH`, newest first on the wire)
//! - **Claims**: `SET scheduled_posts:claim:<post>:<config> 1 NX EX <ttl>`

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::instrument;

use crate::core::{DeliveryQueue, Job, JobKey, SchedulerError};

/// Default sorted-set key for the live queue.
pub const DEFAULT_QUEUE_KEY: &str = "scheduled_posts";
/// Default list key for dead letters.
pub const DEFAULT_DEAD_LETTER_KEY: &str = "failed_posts";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn backend(e: redis::RedisError) -> SchedulerError {
    SchedulerError::Backend(e.to_string())
}

/// Delivery queue shared across processes and restarts through Redis.
#[derive(Clone)]
pub struct RedisDeliveryQueue {
    conn: MultiplexedConnection,
    queue_key: String,
    dead_letter_key: String,
}

impl std::fmt::Debug for RedisDeliveryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisDeliveryQueue")
            .field("queue_key", &self.queue_key)
            .field("dead_letter_key", &self.dead_letter_key)
            .finish_non_exhaustive()
    }
}

impl RedisDeliveryQueue {
    /// Connect and verify the server answers `PING` within five seconds.
    ///
    /// Failure here is a bootstrap error the caller should treat as fatal.
    pub async fn connect(redis_url: &str) -> Result<Self, SchedulerError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| SchedulerError::Backend(format!("failed to parse redis URL: {e}")))?;

        let connect = async {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(conn)
        };
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| SchedulerError::Backend("timed out connecting to redis".into()))?
            .map_err(|e| SchedulerError::Backend(format!("failed to connect to redis: {e}")))?;

        Ok(Self {
            conn,
            queue_key: DEFAULT_QUEUE_KEY.into(),
            dead_letter_key: DEFAULT_DEAD_LETTER_KEY.into(),
        })
    }

    /// Use custom keys, e.g. to isolate environments on one server.
    #[must_use]
    pub fn with_keys(mut self, queue_key: impl Into<String>, dead_letter_key: impl Into<String>) -> Self {
        self.queue_key = queue_key.into();
        self.dead_letter_key = dead_letter_key.into();
        self
    }

    fn claim_key(&self, key: &JobKey) -> String {
        format!("{}:claim:{key}", self.queue_key)
    }
}

#[async_trait]
impl DeliveryQueue for RedisDeliveryQueue {
    #[instrument(skip(self, job), fields(post_id = %job.post_id, score = job.score()), err)]
    async fn admit(&self, job: &Job) -> Result<(), SchedulerError> {
        let member = job.encode()?;
        let mut conn = self.conn.clone();
        // Scores stay below 2^53, so the f64 is exact.
        #[allow(clippy::cast_precision_loss)]
        let score = job.score() as f64;
        let _: i64 = redis::cmd("ZADD")
            .arg(&self.queue_key)
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn extract_highest(&self) -> Result<Option<String>, SchedulerError> {
        let mut conn = self.conn.clone();
        // Reply is a flat [member, score] array.
        let popped: Vec<String> = redis::cmd("ZPOPMAX")
            .arg(&self.queue_key)
            .arg(1)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(popped.into_iter().next())
    }

    async fn dead_letter(&self, job: &Job) -> Result<(), SchedulerError> {
        let data = job.encode()?;
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("LPUSH")
            .arg(&self.dead_letter_key)
            .arg(data)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn claim(&self, key: &JobKey, ttl: Duration) -> Result<bool, SchedulerError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.claim_key(key))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(reply.is_some())
    }

    async fn release(&self, key: &JobKey) -> Result<(), SchedulerError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(self.claim_key(key))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn len(&self) -> Result<usize, SchedulerError> {
        let mut conn = self.conn.clone();
        redis::cmd("ZCARD")
            .arg(&self.queue_key)
            .query_async(&mut conn)
            .await
            .map_err(backend)
    }

    async fn dead_letters(&self) -> Result<Vec<Job>, SchedulerError> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(&self.dead_letter_key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        // LPUSH stores newest first; report in failure order.
        raw.iter().rev().map(|member| Job::decode(member)).collect()
    }
}
