//! Ordering properties of the queue score.

use chrono::{DateTime, TimeZone, Utc};
use post_scheduler::core::{score, DeliveryQueue, Job, Platform, Priority, PRIORITY_WEIGHT};
use post_scheduler::infra::queue::InMemoryDeliveryQueue;
use proptest::prelude::*;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Normal), Just(Priority::High)]
}

// Up to the end of year 9999.
fn seconds() -> impl Strategy<Value = i64> {
    -1_000_000i64..253_402_300_799
}

fn job(id: usize, priority: Priority, secs: i64) -> Job {
    Job {
        post_id: format!("post-{id}"),
        platform_config_id: format!("cfg-{id}"),
        platform: Platform::X,
        account_id: "acct".into(),
        content: "body".into(),
        media_urls: Vec::new(),
        hashtags: Vec::new(),
        scheduled_at: at(secs),
        priority,
        retry_count: 0,
    }
}

#[test]
fn test_score_clamps_pre_epoch() {
    assert_eq!(score(Priority::High, at(-5)), 3 * PRIORITY_WEIGHT);
    assert_eq!(score(Priority::Low, at(0)), PRIORITY_WEIGHT);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        ..ProptestConfig::default()
    })]

    /// Property: a higher tier outranks a lower tier whatever the timestamps.
    #[test]
    fn higher_tier_always_wins(a in seconds(), b in seconds()) {
        prop_assert!(score(Priority::High, at(a)) > score(Priority::Normal, at(b)));
        prop_assert!(score(Priority::Normal, at(a)) > score(Priority::Low, at(b)));
    }

    /// Property: within a tier, an earlier post outranks a later one.
    /// Pre-epoch times are excluded: they clamp to one score and tie.
    #[test]
    fn earlier_wins_within_tier(p in priority(), a in 0i64..253_402_300_799, delta in 1i64..1_000_000) {
        prop_assert!(score(p, at(a)) > score(p, at(a + delta)));
    }

    /// Property: retries never change the score.
    #[test]
    fn retry_count_does_not_move_score(p in priority(), a in seconds(), retries in 0u32..10) {
        let mut j = job(0, p, a);
        let before = j.score();
        j.retry_count = retries;
        prop_assert_eq!(j.score(), before);
    }

    /// Property: extraction order is priority descending, then due time ascending.
    #[test]
    fn queue_drains_in_score_order(entries in prop::collection::vec((priority(), 0i64..4_000_000_000), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let drained: Vec<Job> = rt.block_on(async {
            let queue = InMemoryDeliveryQueue::new();
            for (i, (p, secs)) in entries.iter().enumerate() {
                queue.admit(&job(i, *p, *secs)).await.unwrap();
            }
            let mut out = Vec::new();
            while let Some(raw) = queue.extract_highest().await.unwrap() {
                out.push(Job::decode(&raw).unwrap());
            }
            out
        });

        prop_assert_eq!(drained.len(), entries.len());
        for pair in drained.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            prop_assert!(
                first.priority > second.priority
                    || (first.priority == second.priority && first.scheduled_at <= second.scheduled_at)
            );
        }
    }
}
