//! # Post Scheduler
//!
//! Time-scheduled delivery of social posts to external publishing platforms,
//! ordered by workspace tier and resilient to transient delivery failures.
//!
//! ## Pipeline
//!
//! ```text
//!  source store ──(every 30s)──► AdmissionPoller ──admit──►  DeliveryQueue
//!                                                            │         │
//!                                          extract_highest ◄─┘         └─► dead letters
//!                                                │
//!                                          DispatchLoop ──deliver──► PlatformRouter ──► platform client
//!                                                │
//!                                  failure: retry timer ──admit (after backoff)──► DeliveryQueue
//! ```
//!
//! - **Admission**: rows due in `(now - 15m, now + 1m]` become [`core::Job`]s,
//!   claimed once per job key and scored `priority * 10^12 - scheduled_at`.
//! - **Dispatch**: the highest score is extracted atomically and delivered
//!   through the platform's capability. Failures back off `retry_count * 2m`
//!   on a detached timer; the third failure moves the job to the dead-letter list.
//! - **Coupling**: the poller and the dispatchers only share the queue.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use post_scheduler::builders::{build_queue, build_router};
//! use post_scheduler::config::SchedulerConfig;
//! use post_scheduler::infra::source::InMemorySourceStore;
//! use post_scheduler::runtime::{SchedulerService, TokioSpawner};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = SchedulerConfig::from_env()?;
//! let queue = build_queue(&config.queue).await?;
//! let router = Arc::new(build_router(&config.credentials));
//! let source = Arc::new(InMemorySourceStore::new());
//!
//! let service = SchedulerService::new(&config, queue, source, router, TokioSpawner::current());
//! let cancel = CancellationToken::new();
//! let handle = service.start(&cancel);
//! // ... on shutdown:
//! cancel.cancel();
//! handle.wait_for_shutdown().await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Configuration models for the poller, dispatchers, queue backend and platforms.
pub mod config;
/// Builders to construct pipeline components from configuration.
pub mod builders;
/// Core pipeline: jobs, queue contract, admission, dispatch and routing.
pub mod core;
/// Infrastructure adapters for queues, source stores and platforms.
pub mod infra;
/// Runtime adapters and the long-running service.
pub mod runtime;
/// Shared utilities.
pub mod util;
