//! Runtime adapters and the long-running service surface.

pub mod service;
pub mod tokio_spawner;

pub use service::{SchedulerService, ServiceHandle};
pub use tokio_spawner::TokioSpawner;
