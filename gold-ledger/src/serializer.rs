//! Single-writer serializer for the shared balance
//!
//! Exactly one [`Serializer`] exists per pipeline: it owns the only
//! [`QueueReceiver`] of the mutation queue, and receivers cannot be cloned.
//! That ownership is what gives the balance a single writer applying deltas
//! in the order they were enqueued.
//!
//! # Loop
//!
//! ```text
//!  take delta ──▶ BalanceStore::apply_delta ──▶ AuditEvent ──▶ telemetry queue
//!      │                    │                                        │
//!  interrupted          StorageError                            interrupted
//!      ▼                    ▼                                        ▼
//!    exit          log, drop delta, next                           exit
//! ```
//!
//! A delta whose transaction fails is dropped: it is neither retried nor
//! re-queued, and no audit event is produced for it. The failure is visible
//! only through the error log and `gold_deltas_failed_total`.

use crate::{
    metrics::Metrics,
    observer::OperationObserver,
    queue::{QueueReceiver, QueueSender},
    store::BalanceStore,
    types::{AuditEvent, Delta, OperationNotice, WorkerState, WorkerStatus},
    Result,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// The sole authority turning queued deltas into balance state
pub struct Serializer {
    store: Arc<dyn BalanceStore>,
    mutations: QueueReceiver<Delta>,
    telemetry: QueueSender<AuditEvent>,
    observer: Arc<dyn OperationObserver>,
    metrics: Metrics,
    status: WorkerStatus,
    operations: u64,
}

impl Serializer {
    /// Create new serializer
    pub fn new(
        store: Arc<dyn BalanceStore>,
        mutations: QueueReceiver<Delta>,
        telemetry: QueueSender<AuditEvent>,
        observer: Arc<dyn OperationObserver>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            mutations,
            telemetry,
            observer,
            metrics,
            status: WorkerStatus::new(),
            operations: 0,
        }
    }

    /// Handle on this worker's lifecycle state
    pub fn status(&self) -> WorkerStatus {
        self.status.clone()
    }

    /// Run the serializer loop until interrupted
    pub async fn run(mut self) {
        self.status.set(WorkerState::Running);
        info!(queue = self.mutations.name(), "Serializer started");

        loop {
            let delta = match self.mutations.take().await {
                Ok(delta) => delta,
                Err(e) => {
                    debug!("Serializer interrupted: {}", e);
                    break;
                }
            };

            let event = match self.apply(delta) {
                Ok(event) => event,
                Err(e) => {
                    error!(delta, error = %e, "Balance update failed, delta dropped");
                    self.metrics.record_apply_failure();
                    continue;
                }
            };

            if let Err(e) = self.telemetry.submit(event).await {
                debug!(delta, "Serializer interrupted while publishing audit event: {}", e);
                break;
            }

            self.notify(event);
        }

        self.status.set(WorkerState::Stopping);
        info!(operations = self.operations, "Serializer stopped");
        self.status.set(WorkerState::Stopped);
    }

    /// Apply one delta inside a balance transaction
    fn apply(&self, delta: Delta) -> Result<AuditEvent> {
        let started = Instant::now();
        let resulting_balance = self.store.apply_delta(delta)?;

        self.metrics
            .record_applied(resulting_balance, started.elapsed().as_secs_f64());
        debug!(delta, balance = resulting_balance, "Delta applied");

        Ok(AuditEvent::new(delta, resulting_balance))
    }

    fn notify(&mut self, event: AuditEvent) {
        self.operations += 1;
        self.observer.on_applied(&OperationNotice {
            operation_index: self.operations,
            timestamp: Utc::now(),
            delta: event.delta,
            resulting_balance: event.resulting_balance,
        });
    }
}

/// Spawn the serializer on the current Tokio runtime
pub fn spawn_serializer(serializer: Serializer) -> tokio::task::JoinHandle<()> {
    tokio::spawn(serializer.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;
    use crate::queue::bounded;
    use crate::signal::StopSignal;
    use crate::store::MemoryStore;
    use crate::Error;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingObserver {
        notices: Mutex<Vec<OperationNotice>>,
    }

    impl OperationObserver for RecordingObserver {
        fn on_applied(&self, notice: &OperationNotice) {
            self.notices.lock().push(*notice);
        }
    }

    /// Fails every call listed in `failing_calls` (1-based)
    struct FailingStore {
        inner: MemoryStore,
        calls: Mutex<usize>,
        failing_calls: Vec<usize>,
    }

    impl BalanceStore for FailingStore {
        fn initialize(&self) -> Result<i64> {
            BalanceStore::initialize(&self.inner)
        }

        fn apply_delta(&self, delta: Delta) -> Result<i64> {
            let mut calls = self.calls.lock();
            *calls += 1;
            if self.failing_calls.contains(&*calls) {
                return Err(Error::Storage("connection reset".to_string()));
            }
            self.inner.apply_delta(delta)
        }

        fn balance(&self) -> Result<i64> {
            self.inner.balance()
        }
    }

    #[tokio::test]
    async fn test_applies_in_arrival_order() {
        let signal = StopSignal::new();
        let (delta_tx, delta_rx) = bounded("mutations", 16, signal.listener()).unwrap();
        let (event_tx, mut event_rx) = bounded("telemetry", 16, signal.listener()).unwrap();

        let store = Arc::new(MemoryStore::with_balance(100));
        let observer = Arc::new(RecordingObserver::default());
        let serializer = Serializer::new(
            store.clone(),
            delta_rx,
            event_tx,
            observer.clone(),
            Metrics::new().unwrap(),
        );
        let status = serializer.status();
        assert_eq!(status.get(), WorkerState::Idle);
        let handle = spawn_serializer(serializer);

        for delta in [5, -20, 7] {
            delta_tx.submit(delta).await.unwrap();
        }

        assert_eq!(event_rx.take().await.unwrap(), AuditEvent::new(5, 105));
        assert_eq!(event_rx.take().await.unwrap(), AuditEvent::new(-20, 85));
        assert_eq!(event_rx.take().await.unwrap(), AuditEvent::new(7, 92));
        assert_eq!(status.get(), WorkerState::Running);

        signal.stop();
        handle.await.unwrap();
        assert_eq!(status.get(), WorkerState::Stopped);

        let indices: Vec<u64> = observer
            .notices
            .lock()
            .iter()
            .map(|n| n.operation_index)
            .collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failed_delta_is_dropped() {
        let signal = StopSignal::new();
        let (delta_tx, delta_rx) = bounded("mutations", 16, signal.listener()).unwrap();
        let (event_tx, mut event_rx) = bounded("telemetry", 16, signal.listener()).unwrap();

        let store = Arc::new(FailingStore {
            inner: MemoryStore::with_balance(0),
            calls: Mutex::new(0),
            failing_calls: vec![2],
        });
        let metrics = Metrics::new().unwrap();
        let observer = Arc::new(RecordingObserver::default());
        let serializer = Serializer::new(
            store.clone(),
            delta_rx,
            event_tx,
            observer.clone(),
            metrics.clone(),
        );
        let handle = spawn_serializer(serializer);

        for delta in [1, 2, 3] {
            delta_tx.submit(delta).await.unwrap();
        }

        assert_eq!(event_rx.take().await.unwrap(), AuditEvent::new(1, 1));
        // Delta 2 never produces an event
        assert_eq!(event_rx.take().await.unwrap(), AuditEvent::new(3, 4));
        assert_eq!(store.balance().unwrap(), 4);
        assert_eq!(metrics.deltas_failed.get(), 1);
        assert_eq!(metrics.deltas_applied.get(), 2);

        tokio::time::timeout(Duration::from_secs(1), async {
            while observer.notices.lock().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        signal.stop();
        handle.await.unwrap();

        // The failed delta does not consume an operation index
        let notices = observer.notices.lock();
        let indices: Vec<u64> = notices.iter().map(|n| n.operation_index).collect();
        let deltas: Vec<Delta> = notices.iter().map(|n| n.delta).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(deltas, vec![1, 3]);
        assert_eq!(notices[1].resulting_balance, 4);
        assert!(notices[0].timestamp <= notices[1].timestamp);
    }

    #[tokio::test]
    async fn test_exits_when_blocked_on_full_telemetry_queue() {
        let signal = StopSignal::new();
        let (delta_tx, delta_rx) = bounded("mutations", 16, signal.listener()).unwrap();
        let (event_tx, _event_rx) = bounded("telemetry", 1, signal.listener()).unwrap();

        let store = Arc::new(MemoryStore::with_balance(0));
        let serializer = Serializer::new(
            store.clone(),
            delta_rx,
            event_tx,
            Arc::new(NoopObserver),
            Metrics::new().unwrap(),
        );
        let status = serializer.status();
        let handle = spawn_serializer(serializer);

        delta_tx.submit(1).await.unwrap();
        delta_tx.submit(1).await.unwrap();

        // Second event cannot be published until the audit side drains
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.balance().unwrap(), 2);
        assert_eq!(status.get(), WorkerState::Running);

        signal.stop();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.get(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_exits_when_producers_gone() {
        let signal = StopSignal::new();
        let (delta_tx, delta_rx) = bounded::<Delta>("mutations", 4, signal.listener()).unwrap();
        let (event_tx, _event_rx) = bounded("telemetry", 4, signal.listener()).unwrap();

        let serializer = Serializer::new(
            Arc::new(MemoryStore::with_balance(0)),
            delta_rx,
            event_tx,
            Arc::new(NoopObserver),
            Metrics::new().unwrap(),
        );
        let handle = spawn_serializer(serializer);

        drop(delta_tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
