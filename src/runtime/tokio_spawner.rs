//! Tokio runtime spawner implementation.

use std::future::Future;
use std::sync::Arc;

use tokio_util::task::TaskTracker;

use crate::core::Spawn;

/// Tokio-based spawner that executes tasks on a tokio runtime.
///
/// Every spawned task is registered with a [`TaskTracker`] so shutdown can
/// wait for detached work, such as re-admission timers, to finish.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: Arc<tokio::runtime::Handle>,
    tracker: TaskTracker,
}

impl TokioSpawner {
    /// Create a new TokioSpawner from a tokio runtime handle.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
            tracker: TaskTracker::new(),
        }
    }

    /// Spawner for the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }

    /// Tracker shared by every clone of this spawner.
    pub const fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn_on(fut, &self.handle);
    }
}
