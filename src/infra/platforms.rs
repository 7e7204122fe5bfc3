//! Per-platform delivery clients.
//!
//! Each client checks its OAuth client credentials and then reports the
//! publishing call as not yet implemented; the network integrations for
//! Meta Graph, X v2, LinkedIn UGC and TikTok Content Posting plug in here.

use async_trait::async_trait;

use crate::config::ClientCredentials;
use crate::core::{Deliver, DeliveryError, Job, Platform};

/// Delivery client for one platform.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    platform: Platform,
    credentials: Option<ClientCredentials>,
}

impl PlatformClient {
    /// Create a client; credentials with an empty id or secret count as missing.
    pub fn new(platform: Platform, credentials: Option<ClientCredentials>) -> Self {
        Self {
            platform,
            credentials: credentials.filter(ClientCredentials::is_complete),
        }
    }

    /// Platform this client publishes to.
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    fn require_credentials(&self) -> Result<&ClientCredentials, DeliveryError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| DeliveryError::MissingCredentials(self.platform.clone()))
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_token(&self, _refresh_token: &str) -> Result<String, DeliveryError> {
        self.require_credentials()?;
        Err(DeliveryError::NotImplemented(self.platform.clone()))
    }
}

#[async_trait]
impl Deliver for PlatformClient {
    async fn deliver(&self, job: &Job) -> Result<String, DeliveryError> {
        self.require_credentials()?;
        tracing::debug!(
            platform = %self.platform,
            account_id = %job.account_id,
            media = job.media_urls.len(),
            "no publishing integration wired"
        );
        Err(DeliveryError::NotImplemented(self.platform.clone()))
    }
}
