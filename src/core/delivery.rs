//! Delivery capability abstraction and routing by platform tag.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{DeliveryError, Job, Platform};

/// Publishes a job's content to its destination.
///
/// Returns the destination-assigned identifier on success.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use post_scheduler::core::{Deliver, DeliveryError, Job};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Deliver for Echo {
///     async fn deliver(&self, job: &Job) -> Result<String, DeliveryError> {
///         Ok(format!("echo-{}", job.post_id))
///     }
/// }
/// ```
#[async_trait]
pub trait Deliver: Send + Sync {
    /// Attempt one delivery.
    async fn deliver(&self, job: &Job) -> Result<String, DeliveryError>;
}

/// Dispatch table from platform tag to delivery capability.
#[derive(Clone, Default)]
pub struct PlatformRouter {
    routes: HashMap<Platform, Arc<dyn Deliver>>,
}

impl PlatformRouter {
    /// Create an empty router; every platform is unsupported until registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the capability for `platform`, replacing any previous one.
    #[must_use]
    pub fn with_route(mut self, platform: Platform, deliverer: Arc<dyn Deliver>) -> Self {
        self.routes.insert(platform, deliverer);
        self
    }

    /// Whether a capability is registered for `platform`.
    pub fn supports(&self, platform: &Platform) -> bool {
        self.routes.contains_key(platform)
    }
}

impl std::fmt::Debug for PlatformRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformRouter")
            .field("platforms", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl Deliver for PlatformRouter {
    async fn deliver(&self, job: &Job) -> Result<String, DeliveryError> {
        let Some(deliverer) = self.routes.get(&job.platform) else {
            return Err(DeliveryError::UnsupportedPlatform(job.platform.to_string()));
        };
        tracing::info!(
            post_id = %job.post_id,
            platform = %job.platform,
            "publishing post"
        );
        match deliverer.deliver(job).await {
            Ok(destination_id) => {
                tracing::info!(
                    post_id = %job.post_id,
                    platform = %job.platform,
                    destination_id = %destination_id,
                    "published post"
                );
                Ok(destination_id)
            }
            Err(err) => {
                tracing::error!(platform = %job.platform, error = %err, "failed to publish");
                Err(err)
            }
        }
    }
}
