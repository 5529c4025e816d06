//! Bounded FIFO hand-off queues
//!
//! Both pipeline queues (raw deltas into the serializer, audit events out of
//! it) use the same contract:
//!
//! - capacity is fixed at construction
//! - `submit` waits while the queue is full, `take` waits while it is empty
//! - items come out in the order they went in
//! - once the [`StopSignal`](crate::signal::StopSignal) fires, or the other
//!   side of the channel is gone, both return
//!   [`Error::QueueInterrupted`] instead of a value
//!
//! ```text
//!  QueueSender (Clone) ──┐
//!  QueueSender (Clone) ──┼──▶ mpsc::channel(capacity) ──▶ QueueReceiver (single)
//!  QueueSender (Clone) ──┘
//! ```

use crate::{signal::StopListener, Error, Result};
use tokio::sync::mpsc;

/// Create a bounded queue named `name` holding at most `capacity` items
pub fn bounded<T>(
    name: &'static str,
    capacity: usize,
    stop: StopListener,
) -> Result<(QueueSender<T>, QueueReceiver<T>)> {
    if capacity == 0 {
        return Err(Error::Config(format!(
            "Queue {} capacity must be greater than zero",
            name
        )));
    }

    let (tx, rx) = mpsc::channel(capacity);

    let sender = QueueSender {
        name,
        tx,
        stop: stop.clone(),
    };
    let receiver = QueueReceiver { name, rx, stop };

    Ok((sender, receiver))
}

/// Producer side of a bounded queue
#[derive(Debug)]
pub struct QueueSender<T> {
    name: &'static str,
    tx: mpsc::Sender<T>,
    stop: StopListener,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
            stop: self.stop.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Enqueue `item` at the tail, waiting while the queue is full
    pub async fn submit(&self, item: T) -> Result<()> {
        let mut stop = self.stop.clone();
        if stop.is_stopped() {
            return Err(self.interrupted());
        }

        tokio::select! {
            biased;
            _ = stop.stopped() => Err(self.interrupted()),
            sent = self.tx.send(item) => sent.map_err(|_| self.interrupted()),
        }
    }

    /// Enqueue `item` from a plain OS thread, blocking it while the queue is full
    ///
    /// Unblocks with [`Error::QueueInterrupted`] once the stop signal fires or
    /// the consumer exits. Must not be called from an async task: it parks the
    /// calling thread.
    pub fn blocking_submit(&self, item: T) -> Result<()> {
        futures::executor::block_on(self.submit(item))
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    /// Queue name (for logs)
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn interrupted(&self) -> Error {
        Error::QueueInterrupted(self.name.to_string())
    }
}

/// Consumer side of a bounded queue
///
/// Not `Clone`: every queue has exactly one consumer.
#[derive(Debug)]
pub struct QueueReceiver<T> {
    name: &'static str,
    rx: mpsc::Receiver<T>,
    stop: StopListener,
}

impl<T> QueueReceiver<T> {
    /// Remove and return the head, waiting while the queue is empty
    ///
    /// The stop signal wins over a ready item.
    pub async fn take(&mut self) -> Result<T> {
        if self.stop.is_stopped() {
            return Err(self.interrupted());
        }

        tokio::select! {
            biased;
            _ = self.stop.stopped() => Err(self.interrupted()),
            item = self.rx.recv() => item.ok_or_else(|| self.interrupted()),
        }
    }

    /// Queue name (for logs)
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn interrupted(&self) -> Error {
        Error::QueueInterrupted(self.name.to_string())
    }
}
