//! Transaction management and hierarchical locking (spec.md §4.4, §3).
//!
//! [`LockManager`] owns per-resource lock queues and deadlock detection;
//! [`TransactionManager`] owns the transaction registry and drives
//! `commit`/`abort`, releasing locks through the former. The dependency
//! runs one way only (`TransactionManager` holds `Arc<LockManager>`), so
//! there is no reference cycle to break.

pub mod lock_manager;
pub mod transaction;
pub mod transaction_manager;

pub use lock_manager::{LockManager, LockMode};
pub use transaction::{
    AbortReason, IndexOid, IndexWriteKind, IndexWriteRecord, IsolationLevel, TableOid, TableWriteRecord, Transaction,
    TransactionAbortError, TransactionState, TxnId, INVALID_LSN, INVALID_TXN_ID,
};
pub use transaction_manager::{NoopWalSink, TransactionManager, WalSink};
