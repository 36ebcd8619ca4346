//! Hierarchical 2PL lock manager (spec.md §4.4) — table/row lock queues,
//! isolation-aware admission, upgrades, and background deadlock detection.
//!
//! Three mutex layers, per spec.md §5:
//! 1. [`LockManager::table_lock_map`]/[`LockManager::row_lock_map`] — guard
//!    the top-level `oid → queue`/`rid → queue` maps. Held only for
//!    lookup/insertion, never across a wait.
//! 2. [`LockRequestQueue::state`] — per-queue mutex guarding request
//!    order, `upgrading`, and the condition-variable wait.
//! 3. [`LockManager::waits_for`] — guards the wait-for graph the
//!    detector rebuilds each round.
//!
//! Lock ordering: map latch → queue latch; the map latch is always
//! released before a caller waits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::common::Rid;

use super::transaction::{
    AbortReason, IsolationLevel, TableOid, Transaction, TransactionAbortError, TransactionState, TxnId,
    INVALID_TXN_ID,
};

/// Five multi-granularity lock modes (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    IntentionShared,
    IntentionExclusive,
    Shared,
    SharedIntentionExclusive,
    Exclusive,
}

impl LockMode {
    const ALL: [LockMode; 5] = [
        LockMode::IntentionShared,
        LockMode::IntentionExclusive,
        LockMode::Shared,
        LockMode::SharedIntentionExclusive,
        LockMode::Exclusive,
    ];

    fn index(self) -> usize {
        match self {
            LockMode::IntentionShared => 0,
            LockMode::IntentionExclusive => 1,
            LockMode::Shared => 2,
            LockMode::SharedIntentionExclusive => 3,
            LockMode::Exclusive => 4,
        }
    }
}

/// Compatibility matrix from spec.md §4.4, indexed by [`LockMode::index`].
/// Symmetric by construction (compatibility is a symmetric relation).
const COMPATIBLE: [[bool; 5]; 5] = [
    [true, true, true, true, false],
    [true, true, false, false, false],
    [true, false, true, false, false],
    [true, false, false, false, false],
    [false, false, false, false, false],
];

/// A single queued or granted lock request. Shared via `Arc` so the
/// deadlock detector can read a waiter's `txn` without a side-table.
pub struct LockRequest {
    pub txn: Arc<Transaction>,
    pub mode: LockMode,
    pub oid: TableOid,
    pub rid: Option<Rid>,
    granted: AtomicBool,
}

impl LockRequest {
    fn new(txn: Arc<Transaction>, mode: LockMode, oid: TableOid, rid: Option<Rid>) -> Self {
        Self {
            txn,
            mode,
            oid,
            rid,
            granted: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn txn_id(&self) -> TxnId {
        self.txn.txn_id()
    }

    #[inline]
    pub fn granted(&self) -> bool {
        self.granted.load(Ordering::Acquire)
    }

    fn set_granted(&self, value: bool) {
        self.granted.store(value, Ordering::Release);
    }
}

struct QueueState {
    requests: Vec<Arc<LockRequest>>,
    upgrading: TxnId,
}

/// Per-resource (table or row) lock request queue: ordered requests, an
/// `upgrading` slot, and the condition variable waiters block on
/// (spec.md §3 "Lock request queue").
struct LockRequestQueue {
    state: Mutex<QueueState>,
    cv: Condvar,
}

impl LockRequestQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                requests: Vec::new(),
                upgrading: INVALID_TXN_ID,
            }),
            cv: Condvar::new(),
        }
    }
}

/// Hierarchical lock manager: table and row lock queues, isolation-level
/// admission rules, the upgrade protocol, and a background deadlock
/// detector (spec.md §4.4).
pub struct LockManager {
    table_lock_map: Mutex<HashMap<TableOid, Arc<LockRequestQueue>>>,
    row_lock_map: Mutex<HashMap<Rid, Arc<LockRequestQueue>>>,
    waits_for: Mutex<HashMap<TxnId, Vec<TxnId>>>,
    cycle_detection_interval: Duration,
    detection_running: AtomicBool,
    detector_thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl LockManager {
    pub fn new(cycle_detection_interval: Duration) -> Self {
        Self {
            table_lock_map: Mutex::new(HashMap::new()),
            row_lock_map: Mutex::new(HashMap::new()),
            waits_for: Mutex::new(HashMap::new()),
            cycle_detection_interval,
            detection_running: AtomicBool::new(false),
            detector_thread: Mutex::new(None),
        }
    }

    // ========================================================================
    // Public API (spec.md §6)
    // ========================================================================

    pub fn lock_table(&self, txn: &Arc<Transaction>, mode: LockMode, oid: TableOid) -> Result<bool, TransactionAbortError> {
        if txn.is_aborted() {
            return Ok(false);
        }
        self.check_table_admission(txn, mode)?;
        let queue = self.get_table_queue(oid);
        self.acquire(txn, &queue, mode, oid, None)
    }

    pub fn unlock_table(&self, txn: &Arc<Transaction>, oid: TableOid) -> Result<bool, TransactionAbortError> {
        let queue = self.get_table_queue(oid);
        let held_mode = self.held_mode(&queue, txn.txn_id()).ok_or_else(|| {
            txn.set_state(TransactionState::Aborted);
            TransactionAbortError::new(txn.txn_id(), AbortReason::AttemptedUnlockButNoLockHeld)
        })?;

        self.maybe_transition_to_shrinking(txn, held_mode);

        let still_has_rows = txn.shared_row_lock_set().lock().get(&oid).is_some_and(|s| !s.is_empty())
            || txn.exclusive_row_lock_set().lock().get(&oid).is_some_and(|s| !s.is_empty());
        if still_has_rows {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionAbortError::new(txn.txn_id(), AbortReason::TableUnlockedBeforeUnlockingRows));
        }

        self.erase_granted(&queue, txn.txn_id());
        Self::remove_grant(txn, held_mode, oid, None);
        Ok(true)
    }

    pub fn lock_row(&self, txn: &Arc<Transaction>, mode: LockMode, oid: TableOid, rid: Rid) -> Result<bool, TransactionAbortError> {
        if txn.is_aborted() {
            return Ok(false);
        }
        if matches!(
            mode,
            LockMode::IntentionShared | LockMode::IntentionExclusive | LockMode::SharedIntentionExclusive
        ) {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionAbortError::new(txn.txn_id(), AbortReason::AttemptedIntentionLockOnRow));
        }
        self.check_row_admission(txn, mode, oid)?;
        let queue = self.get_row_queue(rid);
        self.acquire(txn, &queue, mode, oid, Some(rid))
    }

    pub fn unlock_row(&self, txn: &Arc<Transaction>, oid: TableOid, rid: Rid, force: bool) -> Result<bool, TransactionAbortError> {
        let queue = self.get_row_queue(rid);
        let held_mode = self.held_mode(&queue, txn.txn_id()).ok_or_else(|| {
            txn.set_state(TransactionState::Aborted);
            TransactionAbortError::new(txn.txn_id(), AbortReason::AttemptedUnlockButNoLockHeld)
        })?;

        if !force {
            self.maybe_transition_to_shrinking(txn, held_mode);
        }

        self.erase_granted(&queue, txn.txn_id());
        Self::remove_grant(txn, held_mode, oid, Some(rid));
        Ok(true)
    }

    /// For each resource `txn` holds a granted lock on, erase the request
    /// and notify — design note §9(c)'s "`UnlockAll`", driving
    /// `TransactionManager::commit`/`abort`'s lock release.
    pub fn unlock_all(&self, txn: &Transaction) {
        for queue in self.queues_snapshot() {
            let had_entry = {
                let mut state = queue.state.lock();
                let before = state.requests.len();
                state.requests.retain(|r| !(r.granted() && r.txn_id() == txn.txn_id()));
                state.requests.len() != before
            };
            if had_entry {
                queue.cv.notify_all();
            }
        }
        for mode in LockMode::ALL {
            txn.table_lock_set(mode).lock().clear();
        }
        txn.shared_row_lock_set().lock().clear();
        txn.exclusive_row_lock_set().lock().clear();
    }

    // ========================================================================
    // Admission rules (spec.md §4.4 "Isolation admission rules")
    // ========================================================================

    fn check_table_admission(&self, txn: &Transaction, mode: LockMode) -> Result<(), TransactionAbortError> {
        if txn.isolation() == IsolationLevel::ReadUncommitted
            && matches!(mode, LockMode::IntentionShared | LockMode::Shared | LockMode::SharedIntentionExclusive)
        {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionAbortError::new(txn.txn_id(), AbortReason::LockSharedOnReadUncommitted));
        }
        if txn.state() == TransactionState::Shrinking {
            let disallowed = match txn.isolation() {
                IsolationLevel::ReadUncommitted => true,
                IsolationLevel::ReadCommitted => !matches!(mode, LockMode::Shared | LockMode::IntentionShared),
                IsolationLevel::RepeatableRead => true,
            };
            if disallowed {
                txn.set_state(TransactionState::Aborted);
                return Err(TransactionAbortError::new(txn.txn_id(), AbortReason::LockOnShrinking));
            }
        }
        Ok(())
    }

    fn check_row_admission(&self, txn: &Transaction, mode: LockMode, oid: TableOid) -> Result<(), TransactionAbortError> {
        if txn.isolation() == IsolationLevel::ReadUncommitted && mode == LockMode::Shared {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionAbortError::new(txn.txn_id(), AbortReason::LockSharedOnReadUncommitted));
        }
        if txn.state() == TransactionState::Shrinking {
            let disallowed = match txn.isolation() {
                IsolationLevel::ReadUncommitted => true,
                IsolationLevel::ReadCommitted => mode != LockMode::Shared,
                IsolationLevel::RepeatableRead => true,
            };
            if disallowed {
                txn.set_state(TransactionState::Aborted);
                return Err(TransactionAbortError::new(txn.txn_id(), AbortReason::LockOnShrinking));
            }
        }

        let required = match mode {
            LockMode::Shared => &[
                LockMode::IntentionShared,
                LockMode::IntentionExclusive,
                LockMode::Shared,
                LockMode::SharedIntentionExclusive,
                LockMode::Exclusive,
            ][..],
            LockMode::Exclusive => {
                &[LockMode::IntentionExclusive, LockMode::SharedIntentionExclusive, LockMode::Exclusive][..]
            }
            _ => unreachable!("intention modes are rejected before check_row_admission is called"),
        };
        if !txn.holds_any_table_lock(oid, required) {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionAbortError::new(txn.txn_id(), AbortReason::TableLockNotPresent));
        }
        Ok(())
    }

    fn maybe_transition_to_shrinking(&self, txn: &Transaction, mode: LockMode) {
        if txn.state() != TransactionState::Growing {
            return;
        }
        let transitions = match txn.isolation() {
            IsolationLevel::RepeatableRead => matches!(mode, LockMode::Shared | LockMode::Exclusive),
            IsolationLevel::ReadCommitted | IsolationLevel::ReadUncommitted => mode == LockMode::Exclusive,
        };
        if transitions {
            txn.set_state(TransactionState::Shrinking);
        }
    }

    // ========================================================================
    // Upgrade protocol + grant algorithm (spec.md §4.4)
    // ========================================================================

    fn acquire(
        &self,
        txn: &Arc<Transaction>,
        queue: &Arc<LockRequestQueue>,
        mode: LockMode,
        oid: TableOid,
        rid: Option<Rid>,
    ) -> Result<bool, TransactionAbortError> {
        let request;
        {
            let mut state = queue.state.lock();

            if let Some(idx) = state.requests.iter().position(|r| r.granted() && r.txn_id() == txn.txn_id()) {
                let held_mode = state.requests[idx].mode;
                if held_mode == mode {
                    return Ok(true);
                }
                if !Self::can_upgrade(held_mode, mode) {
                    txn.set_state(TransactionState::Aborted);
                    return Err(TransactionAbortError::new(txn.txn_id(), AbortReason::IncompatibleUpgrade));
                }
                if state.upgrading != INVALID_TXN_ID && state.upgrading != txn.txn_id() {
                    txn.set_state(TransactionState::Aborted);
                    return Err(TransactionAbortError::new(txn.txn_id(), AbortReason::UpgradeConflict));
                }

                state.requests.remove(idx);
                Self::remove_grant(txn, held_mode, oid, rid);
                state.upgrading = txn.txn_id();

                let insert_at = state.requests.iter().position(|r| !r.granted()).unwrap_or(state.requests.len());
                let req = Arc::new(LockRequest::new(Arc::clone(txn), mode, oid, rid));
                state.requests.insert(insert_at, Arc::clone(&req));
                request = req;
            } else {
                let req = Arc::new(LockRequest::new(Arc::clone(txn), mode, oid, rid));
                state.requests.push(Arc::clone(&req));
                request = req;
            }

            Self::grant_new_locks_if_possible(&mut state);

            if request.granted() {
                if state.upgrading == txn.txn_id() {
                    state.upgrading = INVALID_TXN_ID;
                }
                drop(state);
                Self::record_grant(txn, mode, oid, rid);
                return Ok(true);
            }
        }

        if !self.wait_for_grant(queue, &request, txn) {
            return Ok(false);
        }
        Self::record_grant(txn, mode, oid, rid);
        Ok(true)
    }

    /// Blocks on the queue's condition variable until `request` is
    /// granted or `txn` is aborted (spec.md §5 "Suspension points"): the
    /// predicate re-runs the grant procedure under `queue.state` before
    /// every sample, so a wake never misses a now-grantable state.
    fn wait_for_grant(&self, queue: &Arc<LockRequestQueue>, request: &Arc<LockRequest>, txn: &Transaction) -> bool {
        let mut state = queue.state.lock();
        queue.cv.wait_while(&mut state, |s| {
            Self::grant_new_locks_if_possible(s);
            !request.granted() && !txn.is_aborted()
        });

        if txn.is_aborted() {
            state.requests.retain(|r| !Arc::ptr_eq(r, request));
            if state.upgrading == txn.txn_id() {
                state.upgrading = INVALID_TXN_ID;
            }
            drop(state);
            queue.cv.notify_all();
            return false;
        }

        if state.upgrading == txn.txn_id() {
            state.upgrading = INVALID_TXN_ID;
        }
        true
    }

    /// Walk the queue from the head, granting the first request
    /// unconditionally and every subsequent request that is compatible
    /// with everything granted so far in this pass; the first
    /// incompatible request stops the walk (spec.md §4.4 "Grant
    /// algorithm").
    fn grant_new_locks_if_possible(state: &mut QueueState) {
        let mut granted_modes: Vec<LockMode> = Vec::new();
        for (i, req) in state.requests.iter().enumerate() {
            if i == 0 {
                req.set_granted(true);
                granted_modes.push(req.mode);
                continue;
            }
            if req.granted() {
                granted_modes.push(req.mode);
                continue;
            }
            if granted_modes.iter().all(|&m| Self::are_compatible(m, req.mode)) {
                req.set_granted(true);
                granted_modes.push(req.mode);
            } else {
                break;
            }
        }
    }

    pub fn are_compatible(a: LockMode, b: LockMode) -> bool {
        COMPATIBLE[a.index()][b.index()]
    }

    fn can_upgrade(held: LockMode, requested: LockMode) -> bool {
        use LockMode::*;
        matches!(
            (held, requested),
            (IntentionShared, Shared)
                | (IntentionShared, Exclusive)
                | (IntentionShared, IntentionExclusive)
                | (IntentionShared, SharedIntentionExclusive)
                | (Shared, Exclusive)
                | (Shared, SharedIntentionExclusive)
                | (IntentionExclusive, Exclusive)
                | (IntentionExclusive, SharedIntentionExclusive)
                | (SharedIntentionExclusive, Exclusive)
        )
    }

    fn record_grant(txn: &Transaction, mode: LockMode, oid: TableOid, rid: Option<Rid>) {
        match rid {
            None => {
                txn.table_lock_set(mode).lock().insert(oid);
            }
            Some(rid) => {
                if let Some(set) = Self::row_set(txn, mode) {
                    set.lock().entry(oid).or_default().insert(rid);
                }
            }
        }
    }

    fn remove_grant(txn: &Transaction, mode: LockMode, oid: TableOid, rid: Option<Rid>) {
        match rid {
            None => {
                txn.table_lock_set(mode).lock().remove(&oid);
            }
            Some(rid) => {
                if let Some(set) = Self::row_set(txn, mode) {
                    let mut guard = set.lock();
                    if let Some(rids) = guard.get_mut(&oid) {
                        rids.remove(&rid);
                        if rids.is_empty() {
                            guard.remove(&oid);
                        }
                    }
                }
            }
        }
    }

    fn row_set(
        txn: &Transaction,
        mode: LockMode,
    ) -> Option<&parking_lot::Mutex<HashMap<TableOid, std::collections::HashSet<Rid>>>> {
        match mode {
            LockMode::Shared => Some(txn.shared_row_lock_set()),
            LockMode::Exclusive => Some(txn.exclusive_row_lock_set()),
            _ => None,
        }
    }

    fn held_mode(&self, queue: &Arc<LockRequestQueue>, txn_id: TxnId) -> Option<LockMode> {
        queue
            .state
            .lock()
            .requests
            .iter()
            .find(|r| r.granted() && r.txn_id() == txn_id)
            .map(|r| r.mode)
    }

    fn erase_granted(&self, queue: &Arc<LockRequestQueue>, txn_id: TxnId) {
        {
            let mut state = queue.state.lock();
            state.requests.retain(|r| !(r.granted() && r.txn_id() == txn_id));
        }
        queue.cv.notify_all();
    }

    fn get_table_queue(&self, oid: TableOid) -> Arc<LockRequestQueue> {
        Arc::clone(self.table_lock_map.lock().entry(oid).or_insert_with(|| Arc::new(LockRequestQueue::new())))
    }

    fn get_row_queue(&self, rid: Rid) -> Arc<LockRequestQueue> {
        Arc::clone(self.row_lock_map.lock().entry(rid).or_insert_with(|| Arc::new(LockRequestQueue::new())))
    }

    fn queues_snapshot(&self) -> Vec<Arc<LockRequestQueue>> {
        let mut all: Vec<Arc<LockRequestQueue>> = self.table_lock_map.lock().values().cloned().collect();
        all.extend(self.row_lock_map.lock().values().cloned());
        all
    }

    // ========================================================================
    // Deadlock detection (spec.md §4.4 "Deadlock detection")
    // ========================================================================

    pub fn add_edge(&self, t1: TxnId, t2: TxnId) {
        let mut g = self.waits_for.lock();
        let entry = g.entry(t1).or_default();
        if !entry.contains(&t2) {
            entry.push(t2);
        }
    }

    pub fn remove_edge(&self, t1: TxnId, t2: TxnId) {
        if let Some(v) = self.waits_for.lock().get_mut(&t1) {
            v.retain(|&x| x != t2);
        }
    }

    pub fn get_edge_list(&self) -> Vec<(TxnId, TxnId)> {
        self.waits_for
            .lock()
            .iter()
            .flat_map(|(&t, vs)| vs.iter().map(move |&v| (t, v)).collect::<Vec<_>>())
            .collect()
    }

    fn rebuild_wait_for_graph(&self) {
        let mut edges: HashMap<TxnId, Vec<TxnId>> = HashMap::new();
        for queue in self.queues_snapshot() {
            let state = queue.state.lock();
            let granted: Vec<TxnId> = state
                .requests
                .iter()
                .filter(|r| r.granted() && !r.txn.is_aborted())
                .map(|r| r.txn_id())
                .collect();
            for waiter in state.requests.iter().filter(|r| !r.granted() && !r.txn.is_aborted()) {
                let entry = edges.entry(waiter.txn_id()).or_default();
                for &holder in &granted {
                    if holder != waiter.txn_id() && !entry.contains(&holder) {
                        entry.push(holder);
                    }
                }
            }
        }
        *self.waits_for.lock() = edges;
    }

    /// DFS from each source in ascending txn-id order; the first cycle
    /// found wins. Returns the cycle's node set, not just its start —
    /// callers take the max to find the victim (spec.md §4.4 step 2).
    fn find_cycle(&self) -> Option<Vec<TxnId>> {
        let graph = self.waits_for.lock().clone();
        let mut sources: Vec<TxnId> = graph.keys().copied().collect();
        sources.sort_unstable();

        let mut finished = std::collections::HashSet::new();
        for start in sources {
            if finished.contains(&start) {
                continue;
            }
            if let Some(cycle) = Self::dfs_find_cycle(&graph, start, &mut finished) {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs_find_cycle(
        graph: &HashMap<TxnId, Vec<TxnId>>,
        start: TxnId,
        finished: &mut std::collections::HashSet<TxnId>,
    ) -> Option<Vec<TxnId>> {
        let mut stack = vec![start];
        let mut on_stack = std::collections::HashSet::new();
        on_stack.insert(start);
        Self::dfs_step(graph, start, &mut stack, &mut on_stack, finished)
    }

    fn dfs_step(
        graph: &HashMap<TxnId, Vec<TxnId>>,
        node: TxnId,
        stack: &mut Vec<TxnId>,
        on_stack: &mut std::collections::HashSet<TxnId>,
        finished: &mut std::collections::HashSet<TxnId>,
    ) -> Option<Vec<TxnId>> {
        let mut neighbors = graph.get(&node).cloned().unwrap_or_default();
        neighbors.sort_unstable();
        for next in neighbors {
            if on_stack.contains(&next) {
                let pos = stack.iter().position(|&x| x == next).expect("on_stack implies present in stack");
                return Some(stack[pos..].to_vec());
            }
            if finished.contains(&next) {
                continue;
            }
            stack.push(next);
            on_stack.insert(next);
            if let Some(cycle) = Self::dfs_step(graph, next, stack, on_stack, finished) {
                return Some(cycle);
            }
            stack.pop();
            on_stack.remove(&next);
        }
        finished.insert(node);
        None
    }

    /// Rebuild the wait-for graph, detect at most one cycle, and abort
    /// its highest-numbered (youngest) transaction. Returns the victim,
    /// if any. Exposed directly so tests can drive a deterministic round
    /// instead of sleeping for the background thread.
    pub fn run_cycle_detection_once(&self) -> Option<TxnId> {
        self.rebuild_wait_for_graph();
        let victim = self.find_cycle().and_then(|cycle| cycle.into_iter().max());
        if let Some(victim_id) = victim {
            self.abort_victim(victim_id);
        }
        victim
    }

    fn abort_victim(&self, victim_id: TxnId) {
        log::warn!("deadlock detected, aborting txn {victim_id} as victim");
        if let Some(txn) = self.find_transaction(victim_id) {
            txn.set_state(TransactionState::Aborted);
        }
        for queue in self.queues_snapshot() {
            queue.cv.notify_all();
        }
    }

    fn find_transaction(&self, txn_id: TxnId) -> Option<Arc<Transaction>> {
        for queue in self.queues_snapshot() {
            let state = queue.state.lock();
            if let Some(req) = state.requests.iter().find(|r| r.txn_id() == txn_id) {
                return Some(Arc::clone(&req.txn));
            }
        }
        None
    }

    /// Spawn the background detector thread. No-op if already running.
    /// Requires `self` behind an `Arc` so the thread can outlive the
    /// call (spec.md §2 "A background task ... periodically builds the
    /// wait-for graph").
    pub fn start_deadlock_detection(self: &Arc<Self>) {
        if self.detection_running.swap(true, Ordering::SeqCst) {
            return;
        }
        let lock_manager = Arc::clone(self);
        let handle = std::thread::spawn(move || {
            while lock_manager.detection_running.load(Ordering::SeqCst) {
                std::thread::sleep(lock_manager.cycle_detection_interval);
                if !lock_manager.detection_running.load(Ordering::SeqCst) {
                    break;
                }
                lock_manager.run_cycle_detection_once();
            }
        });
        *self.detector_thread.lock() = Some(handle);
    }

    pub fn stop_deadlock_detection(&self) {
        self.detection_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.detector_thread.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LockManager {
    fn drop(&mut self) {
        self.stop_deadlock_detection();
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(crate::common::config::CYCLE_DETECTION_INTERVAL)
    }
}
