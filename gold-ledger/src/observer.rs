//! Observability sink for applied operations
//!
//! Receives one [`OperationNotice`] per committed delta. Never affects
//! correctness: the serializer ignores whatever the sink does.

use crate::types::OperationNotice;

/// Sink notified after each successfully applied delta
pub trait OperationObserver: Send + Sync {
    /// Called from the serializer task; must not block for long
    fn on_applied(&self, notice: &OperationNotice);
}

/// Logs every applied operation through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl OperationObserver for TracingObserver {
    fn on_applied(&self, notice: &OperationNotice) {
        tracing::info!(
            operation = notice.operation_index,
            delta = notice.delta,
            balance = notice.resulting_balance,
            "Operation number: {}. {}",
            notice.operation_index,
            notice.timestamp.to_rfc3339()
        );
    }
}

/// Discards every notice
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl OperationObserver for NoopObserver {
    fn on_applied(&self, _notice: &OperationNotice) {}
}
