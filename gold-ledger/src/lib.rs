//! Gold Ledger
//!
//! Serializes concurrent balance mutations against one shared counter and
//! keeps an asynchronous audit trail of every applied mutation.
//!
//! # Architecture
//!
//! ```text
//! Producers ──▶ mutation queue ──▶ Serializer ──▶ BalanceStore
//!                 (bounded)            │
//!                                      ▼
//!                               telemetry queue ──▶ AuditWriter ──▶ AuditStore
//!                                 (bounded)
//! ```
//!
//! - **Single Writer**: one serializer task owns the only consumer of the
//!   mutation queue, so deltas are applied one at a time in arrival order
//! - **Decoupled Audit**: audit persistence never blocks or fails a balance
//!   update beyond the telemetry queue's capacity
//! - **Backpressure**: producers wait while the mutation queue is full
//!
//! # Invariants
//!
//! - Conservation: final balance = initial balance + Σ(applied deltas)
//! - Exactly once: every applied delta yields one audit event
//! - Ordering: `resulting_balance[i] == resulting_balance[i - 1] + delta[i]`
//!   across the audit trail
//!
//! # Known limitation
//!
//! A delta whose balance transaction fails is dropped (no retry, no
//! dead-letter), and so is an audit event whose append fails. Both are logged
//! and counted in [`metrics`].

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod audit_writer;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod observer;
pub mod producer;
pub mod queue;
pub mod serializer;
pub mod signal;
pub mod storage;
pub mod store;
pub mod types;

// Re-exports
pub use config::{Config, DemoConfig, LogFormat, QueueConfig, RocksDBConfig};
pub use error::{Error, Result};
pub use ledger::GoldLedger;
pub use observer::{NoopObserver, OperationObserver, TracingObserver};
pub use producer::GoldProducer;
pub use storage::Storage;
pub use store::{AuditStore, BalanceStore, MemoryStore};
pub use types::{AuditEvent, AuditRecord, Balance, Delta, OperationNotice, WorkerState};
