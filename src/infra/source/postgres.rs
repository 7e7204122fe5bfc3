//! Postgres source-of-truth adapter. Read-only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use crate::core::{DueRow, DueWindow, SchedulerError, SourceStore};

const DUE_ROWS_QUERY: &str = r#"
SELECT
    p.id::text AS post_id,
    pc.id::text AS platform_config_id,
    pc.platform::text AS platform,
    pc.account_id::text AS account_id,
    NULLIF(pc.content, '') AS config_content,
    COALESCE(p.content, '') AS post_content,
    pc.media_urls::text AS config_media_urls,
    p.media_urls::text AS post_media_urls,
    pc.hashtags::text AS hashtags,
    p.scheduled_at::timestamptz AS scheduled_at,
    CASE
        WHEN w.tier = 'ENTERPRISE' THEN 3
        WHEN w.tier = 'PROFESSIONAL' THEN 2
        ELSE 1
    END AS priority
FROM posts p
JOIN post_platform_configs pc ON pc.post_id = p.id
JOIN workspaces w ON w.id = p.workspace_id
WHERE p.status = 'SCHEDULED'
  AND pc.status = 'SCHEDULED'
  AND p.scheduled_at > $1
  AND p.scheduled_at <= $2
ORDER BY priority DESC, p.scheduled_at ASC
"#;

#[derive(FromRow)]
struct DueRowRecord {
    post_id: String,
    platform_config_id: String,
    platform: String,
    account_id: String,
    config_content: Option<String>,
    post_content: String,
    config_media_urls: Option<String>,
    post_media_urls: Option<String>,
    hashtags: Option<String>,
    scheduled_at: DateTime<Utc>,
    priority: i32,
}

impl From<DueRowRecord> for DueRow {
    fn from(r: DueRowRecord) -> Self {
        Self {
            post_id: r.post_id,
            platform_config_id: r.platform_config_id,
            platform: r.platform,
            account_id: r.account_id,
            config_content: r.config_content,
            post_content: r.post_content,
            config_media_urls: r.config_media_urls,
            post_media_urls: r.post_media_urls,
            hashtags: r.hashtags,
            scheduled_at: r.scheduled_at,
            priority: r.priority,
        }
    }
}

/// Queries due rows from the application database.
#[derive(Debug, Clone)]
pub struct PostgresSourceStore {
    pool: PgPool,
}

impl PostgresSourceStore {
    /// Wrap an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, SchedulerError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await
            .map_err(|e| SchedulerError::Source(format!("failed to connect to database: {e}")))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl SourceStore for PostgresSourceStore {
    async fn fetch_due(&self, window: DueWindow) -> Result<Vec<DueRow>, SchedulerError> {
        let records: Vec<DueRowRecord> = sqlx::query_as(DUE_ROWS_QUERY)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SchedulerError::Source(format!("failed to query posts: {e}")))?;
        Ok(records.into_iter().map(DueRow::from).collect())
    }
}
