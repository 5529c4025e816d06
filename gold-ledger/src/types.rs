//! Core types for the gold ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Cheap hand-off between workers (`Copy` where possible)
//! - Checked arithmetic on the shared balance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Signed amount added to (or, if negative, subtracted from) the shared balance
pub type Delta = i64;

/// The single durable running total
pub type Balance = i64;

/// Immutable record of one applied delta and the balance it produced
///
/// Built by the serializer from the value returned by the same balance
/// transaction; never re-read afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Applied delta
    pub delta: Delta,

    /// Balance right after the delta was committed
    pub resulting_balance: Balance,
}

impl AuditEvent {
    /// Create new audit event
    pub fn new(delta: Delta, resulting_balance: Balance) -> Self {
        Self {
            delta,
            resulting_balance,
        }
    }

    /// Balance before this delta was applied, `None` if out of range
    pub fn previous_balance(&self) -> Option<Balance> {
        self.resulting_balance.checked_sub(self.delta)
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+} -> {}", self.delta, self.resulting_balance)
    }
}

/// Persisted form of an [`AuditEvent`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Position in the audit trail (strictly increasing, survives restarts)
    pub sequence: u64,

    /// Applied delta
    pub delta: Delta,

    /// Balance right after the delta was committed
    pub resulting_balance: Balance,

    /// When the record was persisted
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Build the record for `event` at position `sequence`
    pub fn from_event(sequence: u64, event: &AuditEvent) -> Self {
        Self {
            sequence,
            delta: event.delta,
            resulting_balance: event.resulting_balance,
            recorded_at: Utc::now(),
        }
    }

    /// The event this record was persisted from
    pub fn event(&self) -> AuditEvent {
        AuditEvent::new(self.delta, self.resulting_balance)
    }
}

/// Notification sent to the observability sink after each applied delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationNotice {
    /// 1-based count of successfully applied deltas
    pub operation_index: u64,

    /// When the delta was committed
    pub timestamp: DateTime<Utc>,

    /// Applied delta
    pub delta: Delta,

    /// Balance right after the delta was committed
    pub resulting_balance: Balance,
}

/// Lifecycle of a pipeline worker
///
/// `Idle → Running → Stopping → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Constructed, not yet running
    Idle = 0,
    /// Consuming its queue
    Running = 1,
    /// Stop observed, leaving the loop
    Stopping = 2,
    /// Loop exited
    Stopped = 3,
}

impl WorkerState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            2 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Idle => "idle",
            WorkerState::Running => "running",
            WorkerState::Stopping => "stopping",
            WorkerState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Shared, readable handle on a worker's [`WorkerState`]
#[derive(Debug, Clone)]
pub struct WorkerStatus(Arc<AtomicU8>);

impl WorkerStatus {
    /// New status in [`WorkerState::Idle`]
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(WorkerState::Idle as u8)))
    }

    /// Current state
    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self::new()
    }
}
