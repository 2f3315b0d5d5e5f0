//! Cancellable one-shot timer used to batch heartbeat writes

use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// One-shot debounce timer
///
/// Arming replaces any pending run, so only the latest task can fire.
/// Dropping the timer aborts whatever is pending, which is what ties a
/// pending write's lifetime to its owner: once the owner is gone,
/// nothing fires late.
pub struct Debounce {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debounce {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    /// Arm the timer: run `task` after `delay`, cancelling any
    /// previously armed run first
    pub async fn arm<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Cancel the pending run, if any
    pub async fn cancel(&self) {
        if let Some(pending) = self.pending.lock().await.take() {
            pending.abort();
        }
    }

    /// Whether a run is armed and has not fired yet
    pub async fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .await
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Debounce {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.abort();
        }
    }
}
