//! Counting set of outstanding dispatch work.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Tracks every webhook and plugin task spawned by this process.
///
/// Clones share the same set. [`InFlightTasks::wait_for_zero`] closes the set
/// and resolves once everything spawned so far has finished; tasks spawned
/// after closing are still tracked, so a draining webhook task may still fan
/// out to its plugins.
#[derive(Debug, Clone, Default)]
pub struct InFlightTasks {
    tracker: TaskTracker,
}

impl InFlightTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Stops accepting new work and waits for the count to reach zero.
    pub async fn wait_for_zero(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
