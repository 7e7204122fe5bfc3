//! Scheduler configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::poller::AdmissionSettings;
use crate::core::{Platform, RetryPolicy, SchedulerError};

/// OAuth client credentials for one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    /// Client identifier.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
}

impl ClientCredentials {
    /// Both id and secret are set.
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Credentials per destination platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformCredentials {
    /// Meta (Facebook/Instagram).
    pub meta: Option<ClientCredentials>,
    /// X.
    pub x: Option<ClientCredentials>,
    /// LinkedIn.
    pub linkedin: Option<ClientCredentials>,
    /// TikTok.
    pub tiktok: Option<ClientCredentials>,
}

impl PlatformCredentials {
    /// Credentials for `platform`, if any.
    pub const fn get(&self, platform: &Platform) -> Option<&ClientCredentials> {
        match platform {
            Platform::Meta => self.meta.as_ref(),
            Platform::X => self.x.as_ref(),
            Platform::LinkedIn => self.linkedin.as_ref(),
            Platform::TikTok => self.tiktok.as_ref(),
            Platform::Other(_) => None,
        }
    }
}

/// Delivery queue backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueBackendConfig {
    /// In-memory queue for development/testing.
    InMemory,
    /// JSON-lines files under `path`.
    File {
        /// Directory holding the queue files.
        path: String,
        /// File name stem.
        stream: String,
    },
    /// Redis sorted set and list.
    Redis {
        /// Connection URL.
        url: String,
    },
}

impl Default for QueueBackendConfig {
    fn default() -> Self {
        Self::Redis {
            url: "redis://localhost:6379".into(),
        }
    }
}

/// Admission poller timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Seconds between admission cycles.
    pub interval_secs: u64,
    /// Seconds ahead of now a row becomes eligible.
    pub lookahead_secs: u64,
    /// Seconds behind now a row stays eligible.
    pub lookback_secs: u64,
    /// Seconds an admission claim lasts.
    pub claim_ttl_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            lookahead_secs: 60,
            lookback_secs: 15 * 60,
            claim_ttl_secs: 16 * 60,
        }
    }
}

impl PollerConfig {
    /// Convert to poller settings.
    pub const fn settings(&self) -> AdmissionSettings {
        AdmissionSettings {
            interval: Duration::from_secs(self.interval_secs),
            lookahead: Duration::from_secs(self.lookahead_secs),
            lookback: Duration::from_secs(self.lookback_secs),
            claim_ttl: Duration::from_secs(self.claim_ttl_secs),
        }
    }
}

/// Dispatch loop tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number of dispatch loops sharing the queue.
    pub dispatchers: usize,
    /// Milliseconds to sleep when the queue is empty.
    pub idle_wait_ms: u64,
    /// Failed attempts before dead-lettering.
    pub max_attempts: u32,
    /// Seconds of backoff added per failed attempt.
    pub backoff_step_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dispatchers: 1,
            idle_wait_ms: 100,
            max_attempts: 3,
            backoff_step_secs: 120,
        }
    }
}

impl DispatchConfig {
    /// Retry policy for the dispatch loops.
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_step: Duration::from_secs(self.backoff_step_secs),
        }
    }

    /// Empty-queue sleep.
    pub const fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Deployment environment, e.g. `development` or `production`.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Source-of-truth database URL.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Queue backend.
    #[serde(default)]
    pub queue: QueueBackendConfig,
    /// Admission poller settings.
    #[serde(default)]
    pub poller: PollerConfig,
    /// Dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Platform credentials.
    #[serde(default)]
    pub credentials: PlatformCredentials,
}

fn default_environment() -> String {
    "development".into()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            database_url: None,
            queue: QueueBackendConfig::default(),
            poller: PollerConfig::default(),
            dispatch: DispatchConfig::default(),
            credentials: PlatformCredentials::default(),
        }
    }
}

impl SchedulerConfig {
    /// Validate timing and retry values.
    pub fn validate(&self) -> Result<(), String> {
        let p = &self.poller;
        if p.interval_secs == 0 {
            return Err("poller.interval_secs must be greater than 0".into());
        }
        if p.claim_ttl_secs < p.lookback_secs + p.lookahead_secs {
            return Err("poller.claim_ttl_secs must cover the due window".into());
        }
        let d = &self.dispatch;
        if d.dispatchers == 0 {
            return Err("dispatch.dispatchers must be greater than 0".into());
        }
        if d.idle_wait_ms == 0 {
            return Err("dispatch.idle_wait_ms must be greater than 0".into());
        }
        if d.max_attempts == 0 {
            return Err("dispatch.max_attempts must be greater than 0".into());
        }
        match &self.queue {
            QueueBackendConfig::File { path, stream } if path.is_empty() || stream.is_empty() => {
                Err("queue.path and queue.stream must be set for the file backend".into())
            }
            QueueBackendConfig::Redis { url } if url.is_empty() => {
                Err("queue.url must be set for the redis backend".into())
            }
            _ => Ok(()),
        }
    }

    /// Whether the process runs in development mode.
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Parse scheduler configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from the process environment, after reading `.env` if present.
    pub fn from_env() -> Result<Self, SchedulerError> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SchedulerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let parse = |key: &str| -> Result<Option<u64>, SchedulerError> {
            var(key)
                .map(|raw| {
                    raw.parse::<u64>()
                        .map_err(|e| SchedulerError::Config(format!("{key}: {e}")))
                })
                .transpose()
        };
        let creds = |prefix: &str| {
            let creds = ClientCredentials {
                client_id: var(&format!("{prefix}_CLIENT_ID")).unwrap_or_default(),
                client_secret: var(&format!("{prefix}_CLIENT_SECRET")).unwrap_or_default(),
            };
            creds.is_complete().then_some(creds)
        };

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| SchedulerError::Config("DATABASE_URL is required".into()))?;

        let queue = match var("SCHEDULER_QUEUE").as_deref().unwrap_or("redis") {
            "redis" => QueueBackendConfig::Redis {
                url: var("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".into()),
            },
            "file" => QueueBackendConfig::File {
                path: var("SCHEDULER_QUEUE_PATH").unwrap_or_else(|| "./data".into()),
                stream: "scheduled_posts".into(),
            },
            "memory" => QueueBackendConfig::InMemory,
            other => {
                return Err(SchedulerError::Config(format!(
                    "SCHEDULER_QUEUE must be redis, file or memory, got {other}"
                )))
            }
        };

        let mut cfg = Self {
            environment: var("NODE_ENV").unwrap_or_else(default_environment),
            database_url: Some(database_url),
            queue,
            credentials: PlatformCredentials {
                meta: creds("META"),
                x: creds("X"),
                linkedin: creds("LINKEDIN"),
                tiktok: creds("TIKTOK"),
            },
            ..Self::default()
        };
        if let Some(secs) = parse("SCHEDULER_POLL_INTERVAL_SECS")? {
            cfg.poller.interval_secs = secs;
        }
        if let Some(count) = parse("SCHEDULER_DISPATCHERS")? {
            cfg.dispatch.dispatchers = usize::try_from(count)
                .map_err(|e| SchedulerError::Config(format!("SCHEDULER_DISPATCHERS: {e}")))?;
        }

        cfg.validate().map_err(SchedulerError::Config)?;
        Ok(cfg)
    }
}
