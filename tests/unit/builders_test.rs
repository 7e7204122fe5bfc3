//! Tests for builder modules

use chrono::Utc;
use post_scheduler::builders::{build_queue, build_router};
use post_scheduler::config::{ClientCredentials, PlatformCredentials, QueueBackendConfig};
use post_scheduler::core::{Deliver, DeliveryError, DeliveryQueue, Job, Platform, Priority};

fn job(platform: Platform) -> Job {
    Job {
        post_id: "post".into(),
        platform_config_id: "cfg".into(),
        platform,
        account_id: "acct".into(),
        content: "hello".into(),
        media_urls: Vec::new(),
        hashtags: Vec::new(),
        scheduled_at: Utc::now(),
        priority: Priority::Normal,
        retry_count: 0,
    }
}

#[test]
fn test_router_covers_known_platforms() {
    let router = build_router(&PlatformCredentials::default());
    for platform in Platform::KNOWN {
        assert!(router.supports(&platform));
    }
    assert!(!router.supports(&Platform::from("UNKNOWN")));
}

#[tokio::test]
async fn test_router_without_credentials() {
    let router = build_router(&PlatformCredentials::default());
    let err = router.deliver(&job(Platform::Meta)).await.unwrap_err();
    assert_eq!(err, DeliveryError::MissingCredentials(Platform::Meta));
}

#[tokio::test]
async fn test_router_with_credentials() {
    let credentials = PlatformCredentials {
        x: Some(ClientCredentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
        }),
        ..PlatformCredentials::default()
    };
    let router = build_router(&credentials);
    let err = router.deliver(&job(Platform::X)).await.unwrap_err();
    assert_eq!(err, DeliveryError::NotImplemented(Platform::X));
}

#[tokio::test]
async fn test_router_unknown_platform() {
    let router = build_router(&PlatformCredentials::default());
    let err = router.deliver(&job(Platform::from("UNKNOWN"))).await.unwrap_err();
    assert_eq!(err, DeliveryError::UnsupportedPlatform("UNKNOWN".into()));
}

#[tokio::test]
async fn test_build_in_memory_queue() {
    let queue = build_queue(&QueueBackendConfig::InMemory).await.unwrap();
    assert!(queue.is_empty().await.unwrap());
    queue.admit(&job(Platform::TikTok)).await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_build_file_queue() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = QueueBackendConfig::File {
        path: dir.path().to_string_lossy().into_owned(),
        stream: "scheduled_posts".into(),
    };
    let queue = build_queue(&cfg).await.unwrap();
    queue.admit(&job(Platform::LinkedIn)).await.unwrap();
    assert!(dir.path().join("scheduled_posts.jsonl").exists());
}
