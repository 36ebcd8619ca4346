//! Buffer Pool Manager — the core page caching layer (spec.md §4.2).
//!
//! Provides page caching between disk and memory, pin-based reference
//! counting, automatic dirty-page write-back, and LRU-K eviction. Every
//! public operation is serialized under the page table's lock; victims
//! are chosen and written back while it is held, trading I/O concurrency
//! for a simple failure model: a request either fully commits its side
//! effects or returns `Err`/`false` having changed nothing.

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use parking_lot::{Mutex, RwLock};

use crate::buffer::replacer::LruKReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageGuard, ReadGuard, WriteGuard};
use crate::common::config::LRU_K_DEFAULT;
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::DiskManager;

/// Manages a pool of buffer frames for caching disk pages.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │disk_manager  │      │
/// │  │ Vec<FrameId> │  │ LruKReplacer │  │   Mutex      │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `page_table`: `RwLock` — many readers, few writers
/// - `free_list`: `Mutex` — always modified
/// - `replacer`: `Mutex` — internal state changes on access
/// - `disk_manager`: `Mutex` — single-threaded I/O
/// - `frames`: no lock — fixed size, each `Frame` has internal locks
/// - `stats`: no lock — all atomic counters
///
/// # Usage
/// ```ignore
/// let dm = DiskManager::create("test.db")?;
/// let bpm = BufferPoolManager::new(10, dm);
///
/// let mut guard = bpm.new_page()?;
/// guard.as_mut_slice()[0] = 0xAB;
/// // guard drops: page marked dirty, unpinned
///
/// let guard = bpm.fetch_page_read(PageId::new(0))?;
/// let data = guard.as_slice();
/// ```
pub struct BufferPoolManager {
    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame>,

    /// Maps page IDs to frame IDs.
    page_table: RwLock<HashMap<PageId, FrameId>>,

    /// Stack of free frame IDs (LIFO for cache locality).
    free_list: Mutex<Vec<FrameId>>,

    /// Eviction policy for selecting victim frames.
    replacer: Mutex<LruKReplacer>,

    /// Handles all disk I/O.
    disk_manager: Mutex<DiskManager>,

    /// Performance statistics.
    stats: BufferPoolStats,

    /// Number of frames in the pool (immutable after construction).
    pool_size: usize,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager with the default LRU-K `k`
    /// (see [`LRU_K_DEFAULT`]).
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        Self::with_k(pool_size, disk_manager, LRU_K_DEFAULT)
    }

    /// Create a new buffer pool manager, tuning the replacer's `k`.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn with_k(pool_size: usize, disk_manager: DiskManager, k: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: Vec<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Self {
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: Mutex::new(LruKReplacer::new(k)),
            disk_manager: Mutex::new(disk_manager),
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page with a pin-only guard — no latch is acquired.
    ///
    /// # Errors
    /// - `Error::InvalidPageId` if `page_id` is `PageId::INVALID`
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_basic(&self, page_id: PageId) -> Result<PageGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        Ok(PageGuard::new(self, frame_id, page_id))
    }

    /// Fetch a page for reading (shared access).
    ///
    /// If the page is already in the buffer pool, returns immediately.
    /// Otherwise, loads the page from disk (possibly evicting another page).
    ///
    /// # Errors
    /// - `Error::InvalidPageId` if `page_id` is `PageId::INVALID`
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<ReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page();
        Ok(ReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for writing (exclusive access).
    ///
    /// Same as `fetch_page_read`, but returns an exclusive guard. The
    /// page is automatically marked dirty when the guard drops.
    ///
    /// # Errors
    /// - `Error::InvalidPageId` if `page_id` is `PageId::INVALID`
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<WriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();
        Ok(WriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Public API: Create and delete pages
    // ========================================================================

    /// Allocate a new page on disk, load it into the pool, and return a
    /// pin-only guard for it.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - I/O errors from disk allocation
    pub fn new_page_guarded(&self) -> Result<PageGuard<'_>> {
        let (frame_id, page_id) = self.new_page_internal()?;
        Ok(PageGuard::new(self, frame_id, page_id))
    }

    /// Allocate a new page and return a write guard for it directly —
    /// the common case of "allocate then populate".
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - I/O errors from disk allocation
    pub fn new_page(&self) -> Result<WriteGuard<'_>> {
        let (frame_id, page_id) = self.new_page_internal()?;
        let lock = self.frames[frame_id.0].page_mut();
        Ok(WriteGuard::new(self, frame_id, page_id, lock))
    }

    fn new_page_internal(&self) -> Result<(FrameId, PageId)> {
        let frame_id = self.get_free_frame()?;

        let page_id = {
            let mut dm = self.disk_manager.lock();
            dm.allocate_page()?
        };

        let frame = &self.frames[frame_id.0];
        frame.page_mut().reset();
        frame.set_page_id(Some(page_id));
        frame.pin();

        {
            let mut pt = self.page_table.write();
            pt.insert(page_id, frame_id);
        }
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        Ok((frame_id, page_id))
    }

    /// Delete a page from the buffer pool. Does not deallocate it on disk.
    ///
    /// Returns `Ok(true)` if the page was not resident, or once it has
    /// been fully evicted from the pool and its frame freed.
    ///
    /// # Errors
    /// `Error::PagePinned` if the page is resident and still pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut pt = self.page_table.write();

        let frame_id = match pt.get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(true),
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Err(Error::PagePinned(page_id.0));
        }

        pt.remove(&page_id);
        drop(pt);

        if frame.is_dirty() {
            self.flush_frame(frame_id, page_id)?;
        }

        frame.set_page_id(None);
        frame.clear_dirty();

        {
            let mut replacer = self.replacer.lock();
            replacer.remove(frame_id);
        }
        {
            let mut fl = self.free_list.lock();
            fl.push(frame_id);
        }

        Ok(true)
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Unconditionally write a page to disk, clearing its dirty bit.
    /// Returns `Ok(false)` if the page is not resident.
    ///
    /// # Errors
    /// I/O errors from the disk write.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let frame_id = {
            let pt = self.page_table.read();
            match pt.get(&page_id) {
                Some(&fid) => fid,
                None => return Ok(false),
            }
        };
        self.flush_frame_unconditional(frame_id, page_id)?;
        Ok(true)
    }

    /// Flush every resident dirty page to disk.
    ///
    /// # Errors
    /// I/O errors from the disk writes.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<(PageId, FrameId)> = {
            let pt = self.page_table.read();
            pt.iter().map(|(&pid, &fid)| (pid, fid)).collect()
        };

        for (page_id, frame_id) in pages {
            self.flush_frame(frame_id, page_id)?;
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Get the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Get the number of free frames.
    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Get the number of pages currently resident in the pool.
    pub fn page_count(&self) -> usize {
        self.page_table.read().len()
    }

    /// Whether `page_id` is currently resident in the pool.
    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.page_table.read().contains_key(&page_id)
    }

    /// Current pin count of a resident page, or `None` if it isn't resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let frame_id = *self.page_table.read().get(&page_id)?;
        Some(self.frames[frame_id.0].pin_count())
    }

    /// Allocate a fresh page id backed by a disk page, without holding a
    /// pin past the call — equivalent to allocating then immediately
    /// dropping a [`PageGuard`]. Useful when a caller wants an id up
    /// front and will fetch the page later.
    pub fn allocate_page_id(&self) -> Result<PageId> {
        Ok(self.new_page_guarded()?.page_id())
    }

    /// [`Self::fetch_page_read`], but `None` instead of `Err` — callers
    /// that only care about "did I get the page" over the specific
    /// failure reason (spec.md §4.2's "null" failure model).
    pub fn checked_read_page(&self, page_id: PageId) -> Option<ReadGuard<'_>> {
        self.fetch_page_read(page_id).ok()
    }

    /// [`Self::fetch_page_write`], but `None` instead of `Err`.
    pub fn checked_write_page(&self, page_id: PageId) -> Option<WriteGuard<'_>> {
        self.fetch_page_write(page_id).ok()
    }

    /// Direct `UnpinPage` (spec.md §4.2): `Ok(false)` for `INVALID_PAGE_ID`
    /// or an unknown page, `Err(PageNotPinned)` when the page is resident
    /// but already at a zero pin count. Page guards don't go through this
    /// — their own pin is tracked by construction — this is for callers
    /// that pinned a page by `page_id` outside the guard discipline and
    /// need to give that pin back by hand.
    ///
    /// # Errors
    /// `Error::PageNotPinned` if the page's pin count is already zero.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<bool> {
        if !page_id.is_valid() {
            return Ok(false);
        }
        let frame_id = match self.page_table.read().get(&page_id).copied() {
            Some(fid) => fid,
            None => return Ok(false),
        };
        let frame = &self.frames[frame_id.0];
        if !frame.is_pinned() {
            return Err(Error::PageNotPinned(page_id.0));
        }
        self.unpin_page_internal(frame_id, is_dirty);
        Ok(true)
    }

    // ========================================================================
    // Internal: called by page guards on drop / upgrade
    // ========================================================================

    pub(crate) fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.0]
    }

    pub(crate) fn unpin_page_internal(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];

        if is_dirty {
            frame.mark_dirty();
        }

        let new_pin_count = frame.unpin();
        if new_pin_count == 0 {
            let mut replacer = self.replacer.lock();
            replacer.set_evictable(frame_id, true);
        }
    }

    // ========================================================================
    // Internal: core fetch logic
    // ========================================================================

    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }

        {
            let pt = self.page_table.read();
            if let Some(&frame_id) = pt.get(&page_id) {
                self.handle_cache_hit(frame_id);
                return Ok(frame_id);
            }
        }

        self.handle_cache_miss(page_id)
    }

    fn handle_cache_hit(&self, frame_id: FrameId) {
        let frame = &self.frames[frame_id.0];
        frame.pin();

        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn handle_cache_miss(&self, page_id: PageId) -> Result<FrameId> {
        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);

        let frame_id = self.get_free_frame()?;

        let page_data = {
            let mut dm = self.disk_manager.lock();
            dm.read_page(page_id)?
        };
        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);

        let frame = &self.frames[frame_id.0];
        {
            let mut page = frame.page_mut();
            page.as_mut_slice().copy_from_slice(page_data.as_slice());
        }
        frame.set_page_id(Some(page_id));
        frame.pin();

        {
            let mut pt = self.page_table.write();
            pt.insert(page_id, frame_id);
        }
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        Ok(frame_id)
    }

    // ========================================================================
    // Internal: frame allocation and eviction
    // ========================================================================

    fn get_free_frame(&self) -> Result<FrameId> {
        {
            let mut fl = self.free_list.lock();
            if let Some(frame_id) = fl.pop() {
                return Ok(frame_id);
            }
        }
        self.evict_page().inspect_err(|_| log::warn!("buffer pool exhausted: no free frame and no evictable frame"))
    }

    fn evict_page(&self) -> Result<FrameId> {
        let frame_id = {
            let mut replacer = self.replacer.lock();
            replacer.evict().ok_or(Error::NoFreeFrames)?
        };

        self.stats.evictions.fetch_add(1, Ordering::Relaxed);

        let frame = &self.frames[frame_id.0];
        let old_page_id = frame.page_id();
        log::debug!("evicting frame {frame_id} (page {old_page_id:?}) via LRU-K replacer");

        if frame.is_dirty() {
            if let Some(pid) = old_page_id {
                self.flush_frame(frame_id, pid)?;
            }
        }

        if let Some(pid) = old_page_id {
            let mut pt = self.page_table.write();
            pt.remove(&pid);
        }

        frame.clear_dirty();
        frame.set_page_id(None);

        Ok(frame_id)
    }

    /// Write a frame to disk only if it is dirty.
    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        if frame.is_dirty() {
            self.flush_frame_unconditional(frame_id, page_id)?;
        }
        Ok(())
    }

    /// Write a frame to disk regardless of its dirty bit. Used by
    /// `flush_page`, which is unconditional per spec.md §4.2.
    fn flush_frame_unconditional(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        {
            let page = frame.page();
            let mut dm = self.disk_manager.lock();
            dm.write_page(page_id, &page)?;
        }
        frame.clear_dirty();
        self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
