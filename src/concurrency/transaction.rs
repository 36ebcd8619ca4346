//! Transaction state and write logs (spec.md §3 "Transaction", §7).

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use thiserror::Error;

use crate::common::{PageId, Rid};

use super::lock_manager::LockMode;

/// Transaction identifier. Monotonically increasing, assigned by
/// [`super::transaction_manager::TransactionManager::begin`].
pub type TxnId = u64;

/// Table identifier. Opaque to this crate — the catalog (out of scope)
/// owns its meaning.
pub type TableOid = u32;

/// Index identifier, paired with [`TableOid`] in [`IndexWriteRecord`].
pub type IndexOid = u32;

/// Sentinel transaction id meaning "no transaction holds the upgrade
/// slot" (spec.md §3 "Lock request queue").
pub use crate::common::config::INVALID_TXN_ID;

/// Two-phase-locking phase plus terminal outcomes (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Only lock acquisitions are permitted.
    Growing,
    /// Only lock releases are permitted (isolation-level dependent, §4.4).
    Shrinking,
    Committed,
    Aborted,
}

/// Isolation level, governing which lock modes are admissible and when
/// the growing→shrinking transition happens (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
}

/// Typed abort reasons the lock manager raises (spec.md §7). Plain `Copy`
/// enum — [`TransactionAbortError`] is the `thiserror` wrapper that
/// actually implements `std::error::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    LockOnShrinking,
    LockSharedOnReadUncommitted,
    AttemptedIntentionLockOnRow,
    TableLockNotPresent,
    TableUnlockedBeforeUnlockingRows,
    AttemptedUnlockButNoLockHeld,
    IncompatibleUpgrade,
    UpgradeConflict,
}

impl AbortReason {
    fn as_str(self) -> &'static str {
        match self {
            AbortReason::LockOnShrinking => "transaction is in the shrinking phase",
            AbortReason::LockSharedOnReadUncommitted => "shared locks are disallowed under READ_UNCOMMITTED",
            AbortReason::AttemptedIntentionLockOnRow => "intention locks cannot be taken on rows",
            AbortReason::TableLockNotPresent => "the enclosing table lock is not held",
            AbortReason::TableUnlockedBeforeUnlockingRows => "row locks on this table are still held",
            AbortReason::AttemptedUnlockButNoLockHeld => "no lock of this kind is held",
            AbortReason::IncompatibleUpgrade => "the requested mode is not a valid upgrade of the held mode",
            AbortReason::UpgradeConflict => "another transaction is already upgrading this resource",
        }
    }
}

/// Raised by the lock manager in place of BusTub's `TransactionAbortException`
/// — a typed `Err` rather than an exception, carrying the aborting txn id
/// and the reason (spec.md §7).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("transaction {txn_id} aborted: {reason}", reason = .reason.as_str())]
pub struct TransactionAbortError {
    pub txn_id: TxnId,
    pub reason: AbortReason,
}

impl TransactionAbortError {
    pub fn new(txn_id: TxnId, reason: AbortReason) -> Self {
        Self { txn_id, reason }
    }
}

/// One entry in a transaction's table write log — a tuple mutation to
/// replay (by flipping `is_deleted`) on abort (spec.md §3, §4.4 "Abort").
#[derive(Debug, Clone, Copy)]
pub struct TableWriteRecord {
    pub table_oid: TableOid,
    pub rid: Rid,
}

/// The three shapes an index mutation can take, each inverted on abort
/// per spec.md §4.4: insert↔delete, update reverts both keys.
#[derive(Debug, Clone, Copy)]
pub enum IndexWriteKind {
    Insert,
    Delete,
    /// `old_rid` is the row the index previously pointed at; abort
    /// restores that mapping.
    Update { old_rid: Rid },
}

/// One entry in a transaction's index write log.
#[derive(Debug, Clone, Copy)]
pub struct IndexWriteRecord {
    pub table_oid: TableOid,
    pub index_oid: IndexOid,
    pub rid: Rid,
    pub kind: IndexWriteKind,
}

/// A running (or terminated) transaction: 2PL state, isolation level,
/// the five table-lock-mode sets and two row-lock maps, and the write
/// logs `Abort` replays (spec.md §3).
pub struct Transaction {
    txn_id: TxnId,
    isolation: IsolationLevel,
    state: Mutex<TransactionState>,

    shared_table_locks: Mutex<HashSet<TableOid>>,
    exclusive_table_locks: Mutex<HashSet<TableOid>>,
    intention_shared_table_locks: Mutex<HashSet<TableOid>>,
    intention_exclusive_table_locks: Mutex<HashSet<TableOid>>,
    shared_intention_exclusive_table_locks: Mutex<HashSet<TableOid>>,

    shared_row_locks: Mutex<HashMap<TableOid, HashSet<Rid>>>,
    exclusive_row_locks: Mutex<HashMap<TableOid, HashSet<Rid>>>,

    table_write_set: Mutex<Vec<TableWriteRecord>>,
    index_write_set: Mutex<Vec<IndexWriteRecord>>,

    /// Forward-compatibility with the out-of-scope WAL: the LSN of this
    /// transaction's most recent log record, stamped by `prev_lsn` on
    /// every append so the next record can chain to it.
    prev_lsn: Mutex<i64>,
}

/// No previous log record.
pub const INVALID_LSN: i64 = -1;

impl Transaction {
    pub fn new(txn_id: TxnId, isolation: IsolationLevel) -> Self {
        Self {
            txn_id,
            isolation,
            state: Mutex::new(TransactionState::Growing),
            shared_table_locks: Mutex::new(HashSet::new()),
            exclusive_table_locks: Mutex::new(HashSet::new()),
            intention_shared_table_locks: Mutex::new(HashSet::new()),
            intention_exclusive_table_locks: Mutex::new(HashSet::new()),
            shared_intention_exclusive_table_locks: Mutex::new(HashSet::new()),
            shared_row_locks: Mutex::new(HashMap::new()),
            exclusive_row_locks: Mutex::new(HashMap::new()),
            table_write_set: Mutex::new(Vec::new()),
            index_write_set: Mutex::new(Vec::new()),
            prev_lsn: Mutex::new(INVALID_LSN),
        }
    }

    #[inline]
    pub fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    #[inline]
    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    #[inline]
    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    #[inline]
    pub fn set_state(&self, state: TransactionState) {
        *self.state.lock() = state;
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.state() == TransactionState::Aborted
    }

    pub fn prev_lsn(&self) -> i64 {
        *self.prev_lsn.lock()
    }

    pub fn set_prev_lsn(&self, lsn: i64) {
        *self.prev_lsn.lock() = lsn;
    }

    /// Table-lock-mode set accessor, keyed by mode (used by the lock
    /// manager's bookkeeping helpers).
    pub(crate) fn table_lock_set(&self, mode: LockMode) -> &Mutex<HashSet<TableOid>> {
        match mode {
            LockMode::Shared => &self.shared_table_locks,
            LockMode::Exclusive => &self.exclusive_table_locks,
            LockMode::IntentionShared => &self.intention_shared_table_locks,
            LockMode::IntentionExclusive => &self.intention_exclusive_table_locks,
            LockMode::SharedIntentionExclusive => &self.shared_intention_exclusive_table_locks,
        }
    }

    pub fn shared_row_lock_set(&self) -> &Mutex<HashMap<TableOid, HashSet<Rid>>> {
        &self.shared_row_locks
    }

    pub fn exclusive_row_lock_set(&self) -> &Mutex<HashMap<TableOid, HashSet<Rid>>> {
        &self.exclusive_row_locks
    }

    /// Whether this transaction holds at least one of the given modes on
    /// `oid` (used by `CheckAppropriateLockOnTable` equivalent).
    pub(crate) fn holds_any_table_lock(&self, oid: TableOid, modes: &[LockMode]) -> bool {
        modes.iter().any(|&m| self.table_lock_set(m).lock().contains(&oid))
    }

    pub fn holds_row_lock(&self, oid: TableOid, rid: Rid, mode: LockMode) -> bool {
        let set = match mode {
            LockMode::Shared => &self.shared_row_locks,
            LockMode::Exclusive => &self.exclusive_row_locks,
            _ => return false,
        };
        set.lock().get(&oid).is_some_and(|rids| rids.contains(&rid))
    }

    pub fn append_table_write(&self, record: TableWriteRecord) {
        self.table_write_set.lock().push(record);
    }

    pub fn append_index_write(&self, record: IndexWriteRecord) {
        self.index_write_set.lock().push(record);
    }

    /// Snapshot of the table write log, drained for `Abort` to replay.
    pub fn take_table_write_set(&self) -> Vec<TableWriteRecord> {
        std::mem::take(&mut self.table_write_set.lock())
    }

    pub fn take_index_write_set(&self) -> Vec<IndexWriteRecord> {
        std::mem::take(&mut self.index_write_set.lock())
    }

    /// Every page touched in the table write set — a convenience used by
    /// executors rolling back in-place mutations that need a page guard
    /// (not used internally; `table_write_set` only records the rid).
    pub fn table_write_pages(&self) -> Vec<PageId> {
        self.table_write_set.lock().iter().map(|w| w.rid.page_id()).collect()
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("txn_id", &self.txn_id)
            .field("isolation", &self.isolation)
            .field("state", &self.state())
            .finish()
    }
}
