//! Store contracts for the balance and the audit trail
//!
//! The serializer's correctness rests on [`BalanceStore::apply_delta`] being
//! atomic: the add and the read-back happen as one unit, and a failure leaves
//! the balance untouched. The audit trail has no transactional coupling to the
//! balance.

use crate::{
    types::{AuditEvent, AuditRecord, Balance, Delta},
    Error, Result,
};
use parking_lot::Mutex;

/// Owner of the single durable balance
pub trait BalanceStore: Send + Sync {
    /// Create the balance row with 0 if absent, otherwise keep its value
    ///
    /// Idempotent; must run before any delta is applied.
    fn initialize(&self) -> Result<Balance>;

    /// Add `delta` and return the resulting balance, atomically
    fn apply_delta(&self, delta: Delta) -> Result<Balance>;

    /// Current balance
    fn balance(&self) -> Result<Balance>;
}

/// Owner of the append-only audit trail
pub trait AuditStore: Send + Sync {
    /// Make sure the append target exists. Idempotent.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Persist one event, returning its sequence number
    fn append(&self, event: &AuditEvent) -> Result<u64>;

    /// All records in sequence order
    fn records(&self) -> Result<Vec<AuditRecord>>;

    /// Number of persisted records
    fn len(&self) -> Result<usize> {
        Ok(self.records()?.len())
    }

    /// Whether no record has been persisted yet
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Add `delta` to `current`, rejecting overflow as a constraint failure
pub(crate) fn checked_apply(current: Balance, delta: Delta) -> Result<Balance> {
    current.checked_add(delta).ok_or_else(|| {
        Error::Storage(format!(
            "Balance overflow: {} + {} is out of range",
            current, delta
        ))
    })
}

/// In-process store for both the balance and the audit trail
#[derive(Debug, Default)]
pub struct MemoryStore {
    balance: Mutex<Option<Balance>>,
    audit: Mutex<Vec<AuditRecord>>,
}

impl MemoryStore {
    /// Create an empty, un-initialized store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose balance row already holds `balance`
    pub fn with_balance(balance: Balance) -> Self {
        Self {
            balance: Mutex::new(Some(balance)),
            audit: Mutex::new(Vec::new()),
        }
    }
}

impl BalanceStore for MemoryStore {
    fn initialize(&self) -> Result<Balance> {
        let mut balance = self.balance.lock();
        Ok(*balance.get_or_insert(0))
    }

    fn apply_delta(&self, delta: Delta) -> Result<Balance> {
        let mut balance = self.balance.lock();
        let current = balance
            .ok_or_else(|| Error::Storage("Balance row not initialized".to_string()))?;

        let updated = checked_apply(current, delta)?;
        *balance = Some(updated);
        Ok(updated)
    }

    fn balance(&self) -> Result<Balance> {
        self.balance
            .lock()
            .ok_or_else(|| Error::Storage("Balance row not initialized".to_string()))
    }
}

impl AuditStore for MemoryStore {
    fn append(&self, event: &AuditEvent) -> Result<u64> {
        let mut audit = self.audit.lock();
        let sequence = audit.len() as u64 + 1;
        audit.push(AuditRecord::from_event(sequence, event));
        Ok(sequence)
    }

    fn records(&self) -> Result<Vec<AuditRecord>> {
        Ok(self.audit.lock().clone())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.audit.lock().len())
    }
}
