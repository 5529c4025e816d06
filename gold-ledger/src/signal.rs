//! Cooperative stop signal shared by queues and workers
//!
//! One [`StopSignal`] is owned by the startup routine; every blocking queue
//! operation holds a [`StopListener`] and returns
//! [`Error::QueueInterrupted`](crate::Error::QueueInterrupted) once it fires.

use tokio::sync::watch;

/// Owner side of the stop signal
#[derive(Debug)]
pub struct StopSignal {
    sender: watch::Sender<bool>,
}

impl StopSignal {
    /// Create a signal in the "not stopped" state
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Get a listener for this signal
    pub fn listener(&self) -> StopListener {
        StopListener {
            receiver: self.sender.subscribe(),
        }
    }

    /// Raise the signal. Idempotent.
    pub fn stop(&self) {
        self.sender.send_replace(true);
    }

    /// Whether the signal has been raised
    pub fn is_stopped(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener side of the stop signal
///
/// Dropping the [`StopSignal`] counts as a stop.
#[derive(Debug, Clone)]
pub struct StopListener {
    receiver: watch::Receiver<bool>,
}

impl StopListener {
    /// Whether the signal has been raised (or its owner dropped)
    pub fn is_stopped(&self) -> bool {
        *self.receiver.borrow() || self.receiver.has_changed().is_err()
    }

    /// Resolve once the signal is raised
    pub async fn stopped(&mut self) {
        // Err means the owner is gone, which is also a stop
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }
}
