//! Local TTL watchdog for backends without server-side expiry.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// A rearmable timer that runs an expiry callback once a TTL elapses.
///
/// Each schedule is a tokio task, so a pending watchdog never keeps the
/// runtime alive by itself. When the TTL elapses the callback is spawned as
/// a separate detached task: disarming from inside the callback (which is
/// what a release triggered by the watchdog does) therefore cannot abort
/// the callback halfway through.
#[derive(Debug, Default)]
pub struct Watchdog {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Watchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `on_expire` to run after `ttl`, replacing any earlier schedule.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F, Fut>(&self, ttl: Duration, on_expire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            tokio::spawn(on_expire());
        });
        if let Some(previous) = self.task.lock().replace(task) {
            previous.abort();
        }
    }

    /// Cancels the pending schedule, if any.
    pub fn disarm(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Returns true while a schedule is waiting for its TTL.
    pub fn is_armed(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}
