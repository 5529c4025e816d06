//! Producer-facing API
//!
//! Producers are fire-and-forget: a successful submit only means the delta
//! is queued. Whether it was later applied is never reported back.

use crate::{queue::QueueSender, types::Delta, Result};

/// Cloneable handle for submitting deltas to the serializer
#[derive(Debug, Clone)]
pub struct GoldProducer {
    queue: QueueSender<Delta>,
}

impl GoldProducer {
    /// Create new producer over the mutation queue
    pub fn new(queue: QueueSender<Delta>) -> Self {
        Self { queue }
    }

    /// Queue `amount` for application, waiting while the queue is full
    ///
    /// Fails only with [`Error::QueueInterrupted`](crate::Error::QueueInterrupted)
    /// once the pipeline is shutting down.
    pub async fn submit_delta(&self, amount: Delta) -> Result<()> {
        self.queue.submit(amount).await
    }

    /// Same as [`submit_delta`](Self::submit_delta), from a plain OS thread
    ///
    /// Parks the calling thread; use the async variant from tasks.
    pub fn blocking_submit_delta(&self, amount: Delta) -> Result<()> {
        self.queue.blocking_submit(amount)
    }
}
