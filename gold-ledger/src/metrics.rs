//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the pipeline.
//!
//! # Metrics
//!
//! - `gold_deltas_applied_total` - Deltas committed to the balance
//! - `gold_deltas_failed_total` - Deltas dropped after a storage failure
//! - `gold_audit_events_written_total` - Audit records persisted
//! - `gold_audit_events_failed_total` - Audit events dropped after a storage failure
//! - `gold_apply_duration_seconds` - Histogram of balance transaction latencies
//! - `gold_balance` - Last committed balance

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Deltas committed to the balance
    pub deltas_applied: IntCounter,

    /// Deltas dropped after a storage failure
    pub deltas_failed: IntCounter,

    /// Audit records persisted
    pub audit_written: IntCounter,

    /// Audit events dropped after a storage failure
    pub audit_failed: IntCounter,

    /// Balance transaction latency
    pub apply_duration: Histogram,

    /// Last committed balance
    pub balance: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let deltas_applied = IntCounter::new(
            "gold_deltas_applied_total",
            "Deltas committed to the balance",
        )?;
        registry.register(Box::new(deltas_applied.clone()))?;

        let deltas_failed = IntCounter::new(
            "gold_deltas_failed_total",
            "Deltas dropped after a storage failure",
        )?;
        registry.register(Box::new(deltas_failed.clone()))?;

        let audit_written = IntCounter::new(
            "gold_audit_events_written_total",
            "Audit records persisted",
        )?;
        registry.register(Box::new(audit_written.clone()))?;

        let audit_failed = IntCounter::new(
            "gold_audit_events_failed_total",
            "Audit events dropped after a storage failure",
        )?;
        registry.register(Box::new(audit_failed.clone()))?;

        let apply_duration = Histogram::with_opts(
            HistogramOpts::new(
                "gold_apply_duration_seconds",
                "Histogram of balance transaction latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(apply_duration.clone()))?;

        let balance = IntGauge::new("gold_balance", "Last committed balance")?;
        registry.register(Box::new(balance.clone()))?;

        Ok(Self {
            deltas_applied,
            deltas_failed,
            audit_written,
            audit_failed,
            apply_duration,
            balance,
            registry,
        })
    }

    /// Record a committed delta
    pub fn record_applied(&self, balance: i64, duration_seconds: f64) {
        self.deltas_applied.inc();
        self.balance.set(balance);
        self.apply_duration.observe(duration_seconds);
    }

    /// Record a dropped delta
    pub fn record_apply_failure(&self) {
        self.deltas_failed.inc();
    }

    /// Record a persisted audit event
    pub fn record_audit_written(&self) {
        self.audit_written.inc();
    }

    /// Record a dropped audit event
    pub fn record_audit_failure(&self) {
        self.audit_failed.inc();
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
