//! Build the delivery queue and the platform router from configuration.

use std::sync::Arc;

use crate::config::{PlatformCredentials, QueueBackendConfig};
use crate::core::{DeliveryQueue, Platform, PlatformRouter, SchedulerError};
use crate::infra::platforms::PlatformClient;
use crate::infra::queue::{FileDeliveryQueue, InMemoryDeliveryQueue};

/// Route every known platform to its client.
///
/// Platforms without credentials are still routed; their deliveries fail
/// with a missing-credentials error and follow the retry policy.
pub fn build_router(credentials: &PlatformCredentials) -> PlatformRouter {
    Platform::KNOWN
        .into_iter()
        .fold(PlatformRouter::new(), |router, platform| {
            let client = PlatformClient::new(platform.clone(), credentials.get(&platform).cloned());
            router.with_route(platform, Arc::new(client))
        })
}

/// Open the configured queue backend.
///
/// A connection failure here is a bootstrap failure and should stop the process.
pub async fn build_queue(cfg: &QueueBackendConfig) -> Result<Arc<dyn DeliveryQueue>, SchedulerError> {
    match cfg {
        QueueBackendConfig::InMemory => Ok(Arc::new(InMemoryDeliveryQueue::new())),
        QueueBackendConfig::File { path, stream } => {
            Ok(Arc::new(FileDeliveryQueue::open(path, stream.as_str())?))
        }
        #[cfg(feature = "redis")]
        QueueBackendConfig::Redis { url } => Ok(Arc::new(
            crate::infra::queue::RedisDeliveryQueue::connect(url).await?,
        )),
        #[cfg(not(feature = "redis"))]
        QueueBackendConfig::Redis { .. } => Err(SchedulerError::Config(
            "redis queue backend requires the `redis` feature".into(),
        )),
    }
}
