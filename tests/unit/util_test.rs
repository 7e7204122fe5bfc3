//! Tests for job model helpers

use post_scheduler::core::{JobKey, Platform, Priority, WorkspaceTier};

#[test]
fn test_priority_ordering() {
    assert!(Priority::High > Priority::Normal);
    assert!(Priority::Normal > Priority::Low);
}

#[test]
fn test_tier_priority() {
    assert_eq!(WorkspaceTier::Enterprise.priority(), Priority::High);
    assert_eq!(WorkspaceTier::Professional.priority(), Priority::Normal);
    assert_eq!(WorkspaceTier::Free.priority(), Priority::Low);
}

#[test]
fn test_priority_from_u8() {
    assert_eq!(Priority::try_from(3), Ok(Priority::High));
    assert!(Priority::try_from(0).is_err());
    assert!(Priority::try_from(4).is_err());
}

#[test]
fn test_platform_tags() {
    assert_eq!(Platform::from("LINKEDIN"), Platform::LinkedIn);
    assert_eq!(Platform::from("MYSPACE"), Platform::Other("MYSPACE".into()));
    assert_eq!(String::from(Platform::TikTok), "TIKTOK");
}

#[test]
fn test_job_key_display() {
    let key = JobKey {
        post_id: "post1".to_string(),
        platform_config_id: "cfg1".to_string(),
    };
    assert_eq!(key.to_string(), "post1:cfg1");
}

#[test]
fn test_tracing_init_is_idempotent() {
    post_scheduler::util::init_tracing_for("development");
    post_scheduler::util::init_tracing_for("production");
    post_scheduler::util::init_tracing();
}
