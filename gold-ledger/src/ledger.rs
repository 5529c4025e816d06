//! Pipeline orchestration layer
//!
//! [`GoldLedger`] is the startup routine: it bootstraps both stores, builds
//! the two bounded queues, spawns exactly one serializer and one audit writer,
//! and keeps the stop signal so that whoever owns the ledger can shut the
//! pipeline down.
//!
//! # Example
//!
//! ```no_run
//! use gold_ledger::{Config, GoldLedger};
//!
//! #[tokio::main]
//! async fn main() -> gold_ledger::Result<()> {
//!     let ledger = GoldLedger::open(Config::default()).await?;
//!
//!     ledger.submit_delta(10).await?;
//!     ledger.submit_delta(-3).await?;
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    audit_writer::{spawn_audit_writer, AuditWriter},
    config::QueueConfig,
    metrics::Metrics,
    observer::{OperationObserver, TracingObserver},
    producer::GoldProducer,
    queue::bounded,
    serializer::{spawn_serializer, Serializer},
    signal::StopSignal,
    store::{AuditStore, BalanceStore},
    types::{Balance, Delta, WorkerState, WorkerStatus},
    Config, Error, Result, Storage,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Queue names used in logs and interruption errors
const MUTATION_QUEUE: &str = "mutations";
const TELEMETRY_QUEUE: &str = "telemetry";

/// Running gold pipeline
pub struct GoldLedger {
    producer: GoldProducer,
    stop: StopSignal,
    serializer: JoinHandle<()>,
    audit_writer: JoinHandle<()>,
    serializer_status: WorkerStatus,
    audit_writer_status: WorkerStatus,
    balance_store: Arc<dyn BalanceStore>,
    metrics: Metrics,
}

impl GoldLedger {
    /// Open the RocksDB-backed pipeline described by `config`
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(Storage::open(&config)?);

        Self::start(
            storage.clone(),
            storage,
            &config.queues,
            Arc::new(TracingObserver),
        )
    }

    /// Bootstrap the stores and start both workers
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        balance_store: Arc<dyn BalanceStore>,
        audit_store: Arc<dyn AuditStore>,
        queues: &QueueConfig,
        observer: Arc<dyn OperationObserver>,
    ) -> Result<Self> {
        // Both stores must be ready before any worker runs
        let initial_balance = balance_store.initialize()?;
        audit_store.initialize()?;

        let metrics = Metrics::new()?;
        metrics.balance.set(initial_balance);

        let stop = StopSignal::new();
        let (delta_tx, delta_rx) =
            bounded::<Delta>(MUTATION_QUEUE, queues.mutation_capacity, stop.listener())?;
        let (event_tx, event_rx) =
            bounded(TELEMETRY_QUEUE, queues.telemetry_capacity, stop.listener())?;

        let serializer = Serializer::new(
            balance_store.clone(),
            delta_rx,
            event_tx,
            observer,
            metrics.clone(),
        );
        let audit_writer = AuditWriter::new(audit_store, event_rx, metrics.clone());

        let serializer_status = serializer.status();
        let audit_writer_status = audit_writer.status();

        tracing::info!(
            balance = initial_balance,
            mutation_capacity = queues.mutation_capacity,
            telemetry_capacity = queues.telemetry_capacity,
            "Starting gold pipeline"
        );

        Ok(Self {
            producer: GoldProducer::new(delta_tx),
            stop,
            serializer: spawn_serializer(serializer),
            audit_writer: spawn_audit_writer(audit_writer),
            serializer_status,
            audit_writer_status,
            balance_store,
            metrics,
        })
    }

    /// Get a producer handle
    pub fn producer(&self) -> GoldProducer {
        self.producer.clone()
    }

    /// Queue a delta (fire-and-forget)
    pub async fn submit_delta(&self, amount: Delta) -> Result<()> {
        self.producer.submit_delta(amount).await
    }

    /// Current persisted balance
    pub fn balance(&self) -> Result<Balance> {
        self.balance_store.balance()
    }

    /// Serializer lifecycle state
    pub fn serializer_state(&self) -> WorkerState {
        self.serializer_status.get()
    }

    /// Audit writer lifecycle state
    pub fn audit_writer_state(&self) -> WorkerState {
        self.audit_writer_status.get()
    }

    /// Pipeline metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Stop both workers and wait for them to exit
    ///
    /// Deltas and events still queued are discarded.
    pub async fn shutdown(self) -> Result<()> {
        tracing::info!("Shutting down gold pipeline");
        self.stop.stop();

        self.serializer
            .await
            .map_err(|e| Error::Other(format!("Serializer task failed: {}", e)))?;
        self.audit_writer
            .await
            .map_err(|e| Error::Other(format!("Audit writer task failed: {}", e)))?;

        Ok(())
    }
}
