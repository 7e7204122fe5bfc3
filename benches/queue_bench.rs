//! Benchmarks for the delivery pipeline.
//!
//! Benchmarks cover:
//! - Score computation
//! - Queue admit/extract in score order
//! - Contended extraction across dispatchers
//! - Dispatch iterations against a no-op platform

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use post_scheduler::core::{
    score, Deliver, DeliveryError, DeliveryQueue, DispatchLoop, DispatchOutcome, Job, Platform,
    Priority,
};
use post_scheduler::infra::queue::InMemoryDeliveryQueue;
use post_scheduler::runtime::TokioSpawner;

// ============================================================================
// Helpers
// ============================================================================

struct NoOpPlatform;

#[async_trait]
impl Deliver for NoOpPlatform {
    async fn deliver(&self, job: &Job) -> Result<String, DeliveryError> {
        Ok(job.post_id.clone())
    }
}

fn build_job(id: u64) -> Job {
    let priority = match id % 3 {
        0 => Priority::Low,
        1 => Priority::Normal,
        _ => Priority::High,
    };
    Job {
        post_id: format!("post-{id}"),
        platform_config_id: format!("cfg-{id}"),
        platform: Platform::LinkedIn,
        account_id: "bench-account".into(),
        content: format!("scheduled content {id}"),
        media_urls: vec!["https://cdn.example.com/a.png".into()],
        hashtags: vec!["#bench".into()],
        scheduled_at: Utc::now() + ChronoDuration::seconds((id % 600) as i64),
        priority,
        retry_count: 0,
    }
}

// ============================================================================
// Score Benchmarks
// ============================================================================

fn bench_score(c: &mut Criterion) {
    let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    c.bench_function("score", |b| {
        b.iter(|| black_box(score(black_box(Priority::High), black_box(at))));
    });
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn bench_queue_admit_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_admit_extract");

    for size in [100u64, 1_000, 10_000] {
        let jobs: Vec<Job> = (0..size).map(build_job).collect();
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &jobs, |b, jobs| {
            b.to_async(Runtime::new().unwrap()).iter(|| async move {
                let queue = InMemoryDeliveryQueue::new();
                for job in jobs {
                    queue.admit(job).await.unwrap();
                }
                while let Some(raw) = queue.extract_highest().await.unwrap() {
                    black_box(raw);
                }
            });
        });
    }
    group.finish();
}

fn bench_contended_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_extract");

    for dispatchers in [1usize, 4, 8] {
        group.throughput(Throughput::Elements(1_000));
        group.bench_with_input(
            BenchmarkId::from_parameter(dispatchers),
            &dispatchers,
            |b, &dispatchers| {
                b.to_async(Runtime::new().unwrap()).iter(|| async move {
                    let queue = Arc::new(InMemoryDeliveryQueue::new());
                    for id in 0..1_000 {
                        queue.admit(&build_job(id)).await.unwrap();
                    }
                    let handles: Vec<_> = (0..dispatchers)
                        .map(|_| {
                            let queue = Arc::clone(&queue);
                            tokio::spawn(async move {
                                while let Some(raw) = queue.extract_highest().await.unwrap() {
                                    black_box(raw);
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

// ============================================================================
// Dispatch Benchmarks
// ============================================================================

fn bench_dispatch_iteration(c: &mut Criterion) {
    c.bench_function("dispatch_1000_jobs", |b| {
        b.to_async(Runtime::new().unwrap()).iter(|| async {
            let queue = Arc::new(InMemoryDeliveryQueue::new());
            for id in 0..1_000 {
                queue.admit(&build_job(id)).await.unwrap();
            }
            let dispatcher = DispatchLoop::new(
                Arc::clone(&queue),
                Arc::new(NoOpPlatform) as Arc<dyn Deliver>,
                TokioSpawner::current(),
            );
            let cancel = CancellationToken::new();
            while dispatcher.dispatch_next(&cancel).await.unwrap() != DispatchOutcome::Idle {}
        });
    });
}

criterion_group!(scoring, bench_score);
criterion_group!(queue, bench_queue_admit_extract, bench_contended_extract);
criterion_group!(dispatch, bench_dispatch_iteration);
criterion_main!(scoring, queue, dispatch);
