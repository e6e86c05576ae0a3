//! Cancellation signal and cancellable sleep.

use std::time::Duration;

use tokio::sync::watch;

/// Owning side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

/// Observing side of a cancellation signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

/// Creates a connected handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (sender, receiver) = watch::channel(false);
    (CancelHandle { sender }, CancelSignal { receiver })
}

impl CancelHandle {
    /// Requests cancellation. Further calls have no effect.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns another signal observing this handle.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl CancelSignal {
    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes when cancellation is requested.
    ///
    /// If the handle is dropped without cancelling, this never completes.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// How a [`cancellable_sleep`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    Elapsed,
    Cancelled,
}

/// Sleeps for `duration` or until `signal` fires, whichever comes first.
pub async fn cancellable_sleep(duration: Duration, signal: Option<&CancelSignal>) -> SleepOutcome {
    let Some(signal) = signal else {
        tokio::time::sleep(duration).await;
        return SleepOutcome::Elapsed;
    };
    if signal.is_cancelled() {
        return SleepOutcome::Cancelled;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => SleepOutcome::Elapsed,
        _ = signal.cancelled() => SleepOutcome::Cancelled,
    }
}
