//! Collaborator boundary for an on-disk index (SPEC_FULL §6): this crate
//! ships no B+-tree, only the contract a page-guard-backed index would
//! implement against the buffer pool and lock manager.

use crate::common::{Result, Rid};

/// What an executor needs from an index, independent of its internal
/// structure (B+-tree, hash, or otherwise). Implementors are expected to
/// take their own row locks via the lock manager and their own page
/// guards via the buffer pool; this trait only fixes the shape callers
/// depend on.
pub trait Index<K> {
    /// Inserts `key → rid`. Fails only on I/O or storage-layer errors;
    /// duplicate-key policy is the implementor's own to define.
    fn insert(&self, key: &K, rid: Rid) -> Result<()>;

    /// Removes the entry for `key`, if present.
    fn delete(&self, key: &K) -> Result<()>;

    /// Returns every rid stored for `key` (a unique index returns at
    /// most one).
    fn scan(&self, key: &K) -> Result<Vec<Rid>>;
}
