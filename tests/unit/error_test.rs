//! Tests for error types

use post_scheduler::core::{DeliveryError, Platform, SchedulerError};

#[test]
fn test_backend_error() {
    let err = SchedulerError::Backend("connection failed".to_string());
    assert_eq!(format!("{}", err), "backend error: connection failed");
}

#[test]
fn test_source_error() {
    let err = SchedulerError::Source("timeout".to_string());
    assert_eq!(format!("{}", err), "source error: timeout");
}

#[test]
fn test_serialization_error_from_serde() {
    let json_err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
    let err = SchedulerError::from(json_err);
    assert!(matches!(err, SchedulerError::Serialization(_)));
}

#[test]
fn test_missing_credentials_error() {
    let err = DeliveryError::MissingCredentials(Platform::LinkedIn);
    assert_eq!(format!("{}", err), "LINKEDIN API credentials not configured");
}

#[test]
fn test_unsupported_platform_error() {
    let err = DeliveryError::UnsupportedPlatform("MYSPACE".to_string());
    assert_eq!(format!("{}", err), "unsupported platform: MYSPACE");
}

#[test]
fn test_not_implemented_error() {
    let err = DeliveryError::NotImplemented(Platform::TikTok);
    assert_eq!(format!("{}", err), "TIKTOK publishing not yet implemented");
}
