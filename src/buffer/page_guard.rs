//! RAII guards for page access — the sole sanctioned way executors touch
//! pages (spec.md §4.3, §6).
//!
//! Three scoped handles, matching BusTub's `BasicPageGuard` /
//! `ReadPageGuard` / `WritePageGuard`:
//! - [`PageGuard`] — pin only, no latch.
//! - [`ReadGuard`] — pin + shared latch.
//! - [`WriteGuard`] — pin + exclusive latch, marks the page dirty on drop.
//!
//! All three are move-only: dropping, or upgrading into a stronger guard,
//! releases the latch (if any) then the pin exactly once. A guard consumed
//! by `upgrade_read`/`upgrade_write` is forgotten rather than dropped, so
//! the pin transfers to the new guard instead of being released twice.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Pin-only guard: keeps a page resident without taking either latch.
///
/// Useful for callers that only need to guarantee a page stays in the
/// buffer pool (e.g. while deciding whether to upgrade to a read or write
/// guard) without yet contending for the page's reader/writer latch.
pub struct PageGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    is_dirty: bool,
}

impl<'a> PageGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, frame_id: FrameId, page_id: PageId) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            is_dirty: false,
        }
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Mark the underlying page dirty without acquiring a write latch.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Explicitly release the guard now rather than at end of scope
    /// (spec.md §4.3: guards release "on destruction ... or explicit
    /// Drop()"). Equivalent to `drop(guard)`; provided for callers that
    /// want the release to read as an explicit step.
    #[inline]
    pub fn drop_guard(self) {}

    /// Consume this guard and acquire the frame's shared latch.
    pub fn upgrade_read(self) -> ReadGuard<'a> {
        let (bpm, frame_id, page_id, is_dirty) = (self.bpm, self.frame_id, self.page_id, self.is_dirty);
        std::mem::forget(self); // pin ownership moves to ReadGuard, not released twice
        let lock = bpm.frame(frame_id).page();
        ReadGuard {
            bpm,
            frame_id,
            page_id,
            is_dirty,
            lock,
        }
    }

    /// Consume this guard and acquire the frame's exclusive latch.
    pub fn upgrade_write(self) -> WriteGuard<'a> {
        let (bpm, frame_id, page_id) = (self.bpm, self.frame_id, self.page_id);
        std::mem::forget(self);
        let lock = bpm.frame(frame_id).page_mut();
        WriteGuard {
            bpm,
            frame_id,
            page_id,
            lock,
        }
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_page_internal(self.frame_id, self.is_dirty);
    }
}

/// Guard for shared read access to a page.
///
/// Multiple `ReadGuard`s can exist for the same page simultaneously. Both
/// the latch and the pin are released when the guard is dropped.
pub struct ReadGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    is_dirty: bool,
    lock: RwLockReadGuard<'a, Page>,
}

impl<'a> ReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            is_dirty: false,
            lock,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Explicitly release the guard now rather than at end of scope.
    #[inline]
    pub fn drop_guard(self) {}
}

impl Deref for ReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_page_internal(self.frame_id, self.is_dirty);
    }
}

/// Guard for exclusive write access to a page.
///
/// Only one `WriteGuard` can exist for a page at a time. The page is
/// always marked dirty when the guard drops — a write guard implies a
/// mutation was possible, even if the caller didn't end up changing
/// anything.
pub struct WriteGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    lock: RwLockWriteGuard<'a, Page>,
}

impl<'a> WriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Explicitly release the guard now rather than at end of scope.
    #[inline]
    pub fn drop_guard(self) {}
}

impl Deref for WriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for WriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.lock
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_page_internal(self.frame_id, true);
    }
}
