//! Core pipeline: job model, queue contract, admission, dispatch and delivery routing.

pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod poller;
pub mod queue;
pub mod spawn;

pub use delivery::{Deliver, PlatformRouter};
pub use dispatcher::{
    DispatchLoop, DispatchOutcome, DispatchSnapshot, DispatchStats, RetryDecision, RetryPolicy,
};
pub use error::{AppResult, DeliveryError, SchedulerError};
pub use job::{score, Job, JobKey, Platform, Priority, WorkspaceTier, PRIORITY_WEIGHT};
pub use poller::{AdmissionPoller, AdmissionReport, AdmissionSettings, DueRow, DueWindow, SourceStore};
pub use queue::DeliveryQueue;
pub use spawn::Spawn;
