//! Transaction lifecycle: `begin`, `commit`, `abort` (spec.md §4.4
//! "Transaction manager contract", design note §9(b)).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::lock_manager::LockManager;
use super::transaction::{IndexWriteRecord, IsolationLevel, Transaction, TransactionState, TxnId, INVALID_LSN};

/// Sink for commit/abort log records. A no-op implementation ships here;
/// wiring a real WAL in later only means providing another `WalSink`,
/// per SPEC_FULL §3's forward-compatibility note — `commit`/`abort` have
/// a single code path regardless.
pub trait WalSink: Send + Sync {
    /// Appends a log record chained to `prev_lsn`, returning the new LSN.
    fn append(&self, txn_id: TxnId, prev_lsn: i64, committed: bool) -> i64;
}

/// Discards every record; the LSN it hands back always chains off
/// [`INVALID_LSN`] so `Transaction::prev_lsn` bookkeeping is still
/// exercised even with no WAL behind it.
pub struct NoopWalSink;

impl WalSink for NoopWalSink {
    fn append(&self, _txn_id: TxnId, _prev_lsn: i64, _committed: bool) -> i64 {
        INVALID_LSN
    }
}

/// Owns the transaction registry and drives `Commit`/`Abort` (spec.md
/// §4.4). Holds an `Arc<LockManager>` to release locks on
/// commit/abort — the only direction of reference between the two
/// managers, so there is no `Arc` cycle to break with `Weak`.
pub struct TransactionManager {
    lock_manager: Arc<LockManager>,
    wal: Box<dyn WalSink>,
    next_txn_id: AtomicU64,
    active: Mutex<HashMap<TxnId, Arc<Transaction>>>,
}

impl TransactionManager {
    pub fn new(lock_manager: Arc<LockManager>) -> Self {
        Self::with_wal_sink(lock_manager, Box::new(NoopWalSink))
    }

    pub fn with_wal_sink(lock_manager: Arc<LockManager>, wal: Box<dyn WalSink>) -> Self {
        Self {
            lock_manager,
            wal,
            next_txn_id: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    /// Allocates a fresh transaction id and registers a `GROWING`
    /// transaction under it.
    pub fn begin(&self, isolation: IsolationLevel) -> Arc<Transaction> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let txn = Arc::new(Transaction::new(txn_id, isolation));
        self.active.lock().insert(txn_id, Arc::clone(&txn));
        txn
    }

    pub fn get_transaction(&self, txn_id: TxnId) -> Option<Arc<Transaction>> {
        self.active.lock().get(&txn_id).cloned()
    }

    /// Set state → log → release locks (design note §9(b)'s resolved
    /// ordering): waiters observing `COMMITTED` also see a persisted
    /// record, and locks are only released once both have happened.
    pub fn commit(&self, txn: &Transaction) {
        log::debug!("committing txn {}", txn.txn_id());
        txn.set_state(TransactionState::Committed);
        let lsn = self.wal.append(txn.txn_id(), txn.prev_lsn(), true);
        txn.set_prev_lsn(lsn);
        txn.take_table_write_set();
        txn.take_index_write_set();
        self.lock_manager.unlock_all(txn);
        self.active.lock().remove(&txn.txn_id());
    }

    /// Set state → roll back write logs → log → release locks. Neither
    /// write log is rolled back here — this crate owns no tuple storage
    /// or index implementation (spec.md §6 "index module exposes only
    /// the contract boundary") — both drained logs are handed back to
    /// the caller to replay against whichever table/index is wired in:
    /// table writes by toggling `is_deleted`, index writes by inverting
    /// each record's `IndexWriteKind` (insert↔delete, update reverts both
    /// keys), per spec.md §4.4 "Abort".
    pub fn abort(&self, txn: &Transaction) -> (Vec<super::transaction::TableWriteRecord>, Vec<IndexWriteRecord>) {
        log::warn!("aborting txn {}", txn.txn_id());
        txn.set_state(TransactionState::Aborted);

        let table_writes = txn.take_table_write_set();
        let index_writes = txn.take_index_write_set();

        let lsn = self.wal.append(txn.txn_id(), txn.prev_lsn(), false);
        txn.set_prev_lsn(lsn);
        self.lock_manager.unlock_all(txn);
        self.active.lock().remove(&txn.txn_id());
        (table_writes, index_writes)
    }
}
