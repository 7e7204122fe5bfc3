//! In-memory source-of-truth store for development and testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::{DueRow, DueWindow, SchedulerError, SourceStore, WorkspaceTier};

/// Lifecycle status shared by posts and platform configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishStatus {
    /// Being edited.
    Draft,
    /// Waiting for an approver.
    PendingApproval,
    /// Approved and waiting for its time.
    Scheduled,
    /// Delivery in progress.
    Publishing,
    /// Delivered.
    Published,
    /// Delivery failed.
    Failed,
}

/// Workspace row.
#[derive(Debug, Clone)]
pub struct WorkspaceRecord {
    /// Workspace identifier.
    pub id: String,
    /// Subscription tier.
    pub tier: WorkspaceTier,
}

/// Post row.
#[derive(Debug, Clone)]
pub struct PostRecord {
    /// Post identifier.
    pub id: String,
    /// Owning workspace.
    pub workspace_id: String,
    /// Lifecycle status.
    pub status: PublishStatus,
    /// Default content.
    pub content: String,
    /// Default media list, JSON encoded.
    pub media_urls: Option<String>,
    /// Due time, if scheduled.
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Per-platform configuration row of a post.
#[derive(Debug, Clone)]
pub struct PlatformConfigRecord {
    /// Configuration identifier.
    pub id: String,
    /// Parent post.
    pub post_id: String,
    /// Platform tag.
    pub platform: String,
    /// Destination account.
    pub account_id: String,
    /// Lifecycle status.
    pub status: PublishStatus,
    /// Content override.
    pub content: Option<String>,
    /// Media override, JSON encoded.
    pub media_urls: Option<String>,
    /// Hashtags, JSON encoded.
    pub hashtags: Option<String>,
}

#[derive(Default)]
struct Tables {
    workspaces: HashMap<String, WorkspaceRecord>,
    posts: HashMap<String, PostRecord>,
    configs: Vec<PlatformConfigRecord>,
}

/// Source store answering the due-row query from in-process tables.
#[derive(Default)]
pub struct InMemorySourceStore {
    tables: RwLock<Tables>,
    failures: AtomicUsize,
}

impl InMemorySourceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a workspace.
    pub fn insert_workspace(&self, workspace: WorkspaceRecord) {
        self.tables
            .write()
            .workspaces
            .insert(workspace.id.clone(), workspace);
    }

    /// Insert or replace a post.
    pub fn insert_post(&self, post: PostRecord) {
        self.tables.write().posts.insert(post.id.clone(), post);
    }

    /// Add a platform configuration.
    pub fn insert_platform_config(&self, config: PlatformConfigRecord) {
        self.tables.write().configs.push(config);
    }

    /// Change a post's status; returns `false` if the post is unknown.
    pub fn set_post_status(&self, post_id: &str, status: PublishStatus) -> bool {
        self.tables
            .write()
            .posts
            .get_mut(post_id)
            .map(|post| post.status = status)
            .is_some()
    }

    /// Make the next `count` queries fail.
    pub fn fail_next_queries(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl SourceStore for InMemorySourceStore {
    async fn fetch_due(&self, window: DueWindow) -> Result<Vec<DueRow>, SchedulerError> {
        if self.take_failure() {
            return Err(SchedulerError::Source("connection reset by peer".into()));
        }

        let tables = self.tables.read();
        let mut rows: Vec<DueRow> = tables
            .configs
            .iter()
            .filter(|config| config.status == PublishStatus::Scheduled)
            .filter_map(|config| {
                let post = tables.posts.get(&config.post_id)?;
                let workspace = tables.workspaces.get(&post.workspace_id)?;
                let scheduled_at = post.scheduled_at?;
                if post.status != PublishStatus::Scheduled || !window.contains(scheduled_at) {
                    return None;
                }
                Some(DueRow {
                    post_id: post.id.clone(),
                    platform_config_id: config.id.clone(),
                    platform: config.platform.clone(),
                    account_id: config.account_id.clone(),
                    config_content: config.content.clone(),
                    post_content: post.content.clone(),
                    config_media_urls: config.media_urls.clone(),
                    post_media_urls: post.media_urls.clone(),
                    hashtags: config.hashtags.clone(),
                    scheduled_at,
                    priority: i32::from(workspace.tier.priority().value()),
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.scheduled_at.cmp(&b.scheduled_at))
        });
        Ok(rows)
    }
}
