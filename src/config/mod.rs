//! Configuration models for the admission poller, dispatch loops, queue backend and platforms.

pub mod scheduler;

pub use scheduler::{
    ClientCredentials, DispatchConfig, PlatformCredentials, PollerConfig, QueueBackendConfig,
    SchedulerConfig,
};
