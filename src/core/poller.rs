//! Admission poller: discovers due posts and admits them into the delivery queue.
//!
//! Each cycle queries the source-of-truth store for rows inside the due
//! window, resolves per-platform overrides, claims each job key and admits
//! the job. A failure on one row never blocks its siblings, and a failed
//! query is retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{DeliveryQueue, Job, Platform, Priority, SchedulerError};

/// Default interval between admission cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Default look-ahead: rows due up to this far in the future are admitted.
pub const DEFAULT_LOOKAHEAD: Duration = Duration::from_secs(60);
/// Default look-back: older rows are left behind after an outage.
pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(15 * 60);
/// Default claim lifetime; outlives the look-back so a row is claimed once.
pub const DEFAULT_CLAIM_TTL: Duration = Duration::from_secs(16 * 60);

/// Half-open eligibility range `(start, end]` around "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueWindow {
    /// Exclusive lower bound.
    pub start: DateTime<Utc>,
    /// Inclusive upper bound.
    pub end: DateTime<Utc>,
}

impl DueWindow {
    /// Window `(now - lookback, now + lookahead]`.
    pub fn around(now: DateTime<Utc>, lookback: Duration, lookahead: Duration) -> Self {
        Self {
            start: now - chrono::Duration::from_std(lookback).unwrap_or(chrono::Duration::zero()),
            end: now + chrono::Duration::from_std(lookahead).unwrap_or(chrono::Duration::zero()),
        }
    }

    /// Whether `at` is eligible for admission.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start < at && at <= self.end
    }
}

/// A due post x platform-config row as returned by the source-of-truth store.
///
/// Override resolution and list decoding happen in the poller, so the
/// store returns both the config value and the post default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueRow {
    /// Post identifier.
    pub post_id: String,
    /// Platform configuration identifier.
    pub platform_config_id: String,
    /// Platform tag.
    pub platform: String,
    /// Destination account identifier.
    pub account_id: String,
    /// Platform-config content override.
    pub config_content: Option<String>,
    /// Post default content.
    pub post_content: String,
    /// Platform-config media list, JSON encoded.
    pub config_media_urls: Option<String>,
    /// Post default media list, JSON encoded.
    pub post_media_urls: Option<String>,
    /// Platform-config hashtags, JSON encoded. No post fallback.
    pub hashtags: Option<String>,
    /// Due time.
    pub scheduled_at: DateTime<Utc>,
    /// Priority tier computed from the workspace tier.
    pub priority: i32,
}

/// Read-only query surface of the source-of-truth store.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Rows whose post and platform config are schedulable and whose
    /// `scheduled_at` falls inside `window`, ordered by priority descending
    /// then `scheduled_at` ascending.
    async fn fetch_due(&self, window: DueWindow) -> Result<Vec<DueRow>, SchedulerError>;
}

/// Timing knobs for the admission poller.
#[derive(Debug, Clone)]
pub struct AdmissionSettings {
    /// Interval between cycles.
    pub interval: Duration,
    /// How far ahead of now rows become eligible.
    pub lookahead: Duration,
    /// How far behind now rows stay eligible.
    pub lookback: Duration,
    /// Lifetime of the admission claim on a job key.
    pub claim_ttl: Duration,
}

impl Default for AdmissionSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            lookahead: DEFAULT_LOOKAHEAD,
            lookback: DEFAULT_LOOKBACK,
            claim_ttl: DEFAULT_CLAIM_TTL,
        }
    }
}

/// Counters for one admission cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionReport {
    /// Rows returned by the store.
    pub fetched: usize,
    /// Jobs admitted into the queue.
    pub admitted: usize,
    /// Rows skipped because their job key was already claimed.
    pub duplicates: usize,
    /// Rows that could not be claimed, built or admitted.
    pub failed: usize,
    /// Media or hashtag payloads that failed to decode (row still admitted).
    pub decode_errors: usize,
}

/// Producer half of the pipeline.
pub struct AdmissionPoller<S: ?Sized, Q: ?Sized> {
    source: Arc<S>,
    queue: Arc<Q>,
    settings: AdmissionSettings,
}

impl<S, Q> AdmissionPoller<S, Q>
where
    S: SourceStore + ?Sized,
    Q: DeliveryQueue + ?Sized,
{
    /// Create a poller over a source store and a delivery queue.
    pub fn new(source: Arc<S>, queue: Arc<Q>, settings: AdmissionSettings) -> Self {
        Self {
            source,
            queue,
            settings,
        }
    }

    /// Run admission cycles until `cancel` fires.
    ///
    /// The first cycle runs immediately. Query failures are logged and the
    /// next tick tries again.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("admission poller stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.poll_once(Utc::now()).await {
                        Ok(report) if report.fetched > 0 => info!(
                            fetched = report.fetched,
                            admitted = report.admitted,
                            duplicates = report.duplicates,
                            failed = report.failed,
                            decode_errors = report.decode_errors,
                            "admission cycle complete"
                        ),
                        Ok(_) => debug!("no due posts"),
                        Err(e) => warn!(error = %e, "error fetching due posts"),
                    }
                }
            }
        }
    }

    /// Run a single admission cycle as of `now`.
    ///
    /// Only a failed store query is returned as an error; per-row failures
    /// are counted in the report.
    pub async fn poll_once(&self, now: DateTime<Utc>) -> Result<AdmissionReport, SchedulerError> {
        let window = DueWindow::around(now, self.settings.lookback, self.settings.lookahead);
        let rows = self.source.fetch_due(window).await?;

        let mut report = AdmissionReport {
            fetched: rows.len(),
            ..AdmissionReport::default()
        };

        for row in rows {
            let Some(job) = build_job(row, &mut report) else {
                report.failed += 1;
                continue;
            };
            self.admit_claimed(&job, &mut report).await;
        }

        Ok(report)
    }

    async fn admit_claimed(&self, job: &Job, report: &mut AdmissionReport) {
        let key = job.key();
        match self.queue.claim(&key, self.settings.claim_ttl).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(job = %key, "job already admitted, skipping");
                report.duplicates += 1;
                return;
            }
            Err(e) => {
                warn!(job = %key, error = %e, "failed to claim job");
                report.failed += 1;
                return;
            }
        }

        match self.queue.admit(job).await {
            Ok(()) => {
                debug!(job = %key, platform = %job.platform, score = job.score(), "job admitted");
                report.admitted += 1;
            }
            Err(e) => {
                warn!(post_id = %job.post_id, error = %e, "error enqueueing post");
                report.failed += 1;
                // Let the next cycle try again.
                if let Err(e) = self.queue.release(&key).await {
                    warn!(job = %key, error = %e, "failed to release claim");
                }
            }
        }
    }
}

/// Config value wins when present and non-empty, otherwise the post default.
fn resolve_override(config: Option<String>, default: String) -> String {
    config.filter(|value| !value.is_empty()).unwrap_or(default)
}

/// Decode a JSON string list; absent or null decodes to an empty list.
fn decode_list(raw: Option<&str>) -> Result<Vec<String>, serde_json::Error> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => Ok(serde_json::from_str::<Option<Vec<String>>>(raw)?.unwrap_or_default()),
    }
}

fn decode_or_empty(raw: Option<&str>, field: &str, key: &str, report: &mut AdmissionReport) -> Vec<String> {
    decode_list(raw).unwrap_or_else(|e| {
        warn!(job = %key, field, error = %e, "malformed list payload, admitting with empty list");
        report.decode_errors += 1;
        Vec::new()
    })
}

fn build_job(row: DueRow, report: &mut AdmissionReport) -> Option<Job> {
    let key = format!("{}:{}", row.post_id, row.platform_config_id);
    let priority = match u8::try_from(row.priority).map_err(|e| e.to_string()).and_then(Priority::try_from) {
        Ok(priority) => priority,
        Err(e) => {
            warn!(job = %key, error = %e, "row has invalid priority, skipping");
            return None;
        }
    };

    let media_source = resolve_override(
        row.config_media_urls,
        row.post_media_urls.unwrap_or_default(),
    );
    let media_raw = Some(media_source).filter(|raw| !raw.is_empty());
    let media_urls = decode_or_empty(media_raw.as_deref(), "media_urls", &key, report);
    let hashtags = decode_or_empty(row.hashtags.as_deref(), "hashtags", &key, report);

    Some(Job {
        post_id: row.post_id,
        platform_config_id: row.platform_config_id,
        platform: Platform::from(row.platform),
        account_id: row.account_id,
        content: resolve_override(row.config_content, row.post_content),
        media_urls,
        hashtags,
        scheduled_at: row.scheduled_at,
        priority,
        retry_count: 0,
    })
}
