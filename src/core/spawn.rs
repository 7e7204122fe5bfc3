//! Runtime-agnostic task spawning.

use std::future::Future;

/// Abstraction for spawning detached work on a runtime.
///
/// The dispatch loop uses it to run delayed re-admission timers without
/// blocking its own cycle.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
