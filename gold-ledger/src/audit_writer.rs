//! Audit writer: persists audit events off the balance critical path
//!
//! Drains the telemetry queue into the [`AuditStore`]. An append failure is
//! logged and the event dropped; the writer never retries and never pushes
//! back on the serializer beyond the telemetry queue's capacity.

use crate::{
    metrics::Metrics,
    queue::QueueReceiver,
    store::AuditStore,
    types::{AuditEvent, WorkerState, WorkerStatus},
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Single consumer of the telemetry queue
pub struct AuditWriter {
    store: Arc<dyn AuditStore>,
    telemetry: QueueReceiver<AuditEvent>,
    metrics: Metrics,
    status: WorkerStatus,
}

impl AuditWriter {
    /// Create new audit writer
    pub fn new(
        store: Arc<dyn AuditStore>,
        telemetry: QueueReceiver<AuditEvent>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            telemetry,
            metrics,
            status: WorkerStatus::new(),
        }
    }

    /// Handle on this worker's lifecycle state
    pub fn status(&self) -> WorkerStatus {
        self.status.clone()
    }

    /// Run the writer loop until interrupted
    pub async fn run(mut self) {
        self.status.set(WorkerState::Running);
        info!(queue = self.telemetry.name(), "Audit writer started");

        let mut written = 0u64;
        loop {
            let event = match self.telemetry.take().await {
                Ok(event) => event,
                Err(e) => {
                    debug!("Audit writer interrupted: {}", e);
                    break;
                }
            };

            match self.store.append(&event) {
                Ok(sequence) => {
                    written += 1;
                    self.metrics.record_audit_written();
                    debug!(sequence, %event, "Audit event persisted");
                }
                Err(e) => {
                    self.metrics.record_audit_failure();
                    error!(
                        delta = event.delta,
                        balance = event.resulting_balance,
                        error = %e,
                        "Audit append failed, event dropped"
                    );
                }
            }
        }

        self.status.set(WorkerState::Stopping);
        info!(written, "Audit writer stopped");
        self.status.set(WorkerState::Stopped);
    }
}

/// Spawn the audit writer on the current Tokio runtime
pub fn spawn_audit_writer(writer: AuditWriter) -> tokio::task::JoinHandle<()> {
    tokio::spawn(writer.run())
}
