//! LRU-K page replacement policy.
//!
//! Tracks, for each evictable frame, the timestamps of its `k` most recent
//! accesses and evicts the frame with the largest *backward k-distance* —
//! the time since its `k`-th most recent access, or `+∞` if it has fewer
//! than `k` accesses on record. Frames with infinite backward k-distance
//! are compared by earliest-access timestamp (classic LRU), so a cold
//! frame that was only just brought in still loses to one that's been
//! cold even longer.

use std::collections::{HashMap, VecDeque};

use crate::common::FrameId;

/// Backward k-distance: finite with the timestamp it was computed from, or
/// infinite (fewer than `k` accesses) with the earliest recorded access for
/// the LRU tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Distance {
    Finite(u64),
    Infinite { earliest: u64 },
}

impl Distance {
    /// Ordering key for eviction: infinite distances always beat finite
    /// ones; among infinite distances, the earliest `earliest` wins
    /// (oldest first); among finite distances, the largest wins.
    fn eviction_rank(self) -> (u8, u64) {
        match self {
            Distance::Infinite { earliest } => (1, u64::MAX - earliest),
            Distance::Finite(d) => (0, d),
        }
    }
}

struct FrameHistory {
    /// Most recent `k` access timestamps, oldest at the front.
    accesses: VecDeque<u64>,
    evictable: bool,
}

impl FrameHistory {
    fn new() -> Self {
        Self {
            accesses: VecDeque::new(),
            evictable: false,
        }
    }

    fn backward_k_distance(&self, k: usize, now: u64) -> Distance {
        if self.accesses.len() < k {
            Distance::Infinite {
                earliest: *self.accesses.front().unwrap_or(&now),
            }
        } else {
            let kth_most_recent = self.accesses[self.accesses.len() - k];
            Distance::Finite(now - kth_most_recent)
        }
    }
}

/// LRU-K eviction policy over a fixed set of buffer-pool frames.
///
/// Holds its own lock-free-from-the-outside state (callers serialize
/// access through a single `Mutex<LruKReplacer>`, same as the teacher's
/// `FifoReplacer`); it never touches disk or the page table.
pub struct LruKReplacer {
    k: usize,
    history: HashMap<FrameId, FrameHistory>,
    clock: u64,
}

impl LruKReplacer {
    /// Create a replacer tracking the `k` most recent accesses per frame.
    ///
    /// # Panics
    /// Panics if `k` is 0.
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "k must be > 0");
        Self {
            k,
            history: HashMap::new(),
            clock: 0,
        }
    }

    /// Record an access to `frame_id` at the current logical timestamp.
    pub fn record_access(&mut self, frame_id: FrameId) {
        self.clock += 1;
        let now = self.clock;
        let entry = self
            .history
            .entry(frame_id)
            .or_insert_with(FrameHistory::new);
        entry.accesses.push_back(now);
        if entry.accesses.len() > self.k {
            entry.accesses.pop_front();
        }
    }

    /// Toggle whether `frame_id` participates in eviction.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let entry = self
            .history
            .entry(frame_id)
            .or_insert_with(FrameHistory::new);
        entry.evictable = evictable;
    }

    /// Select and remove the frame with the largest backward k-distance
    /// among evictable frames. Returns `None` if none are evictable.
    pub fn evict(&mut self) -> Option<FrameId> {
        let now = self.clock;
        let victim = self
            .history
            .iter()
            .filter(|(_, h)| h.evictable)
            .map(|(fid, h)| (*fid, h.backward_k_distance(self.k, now).eviction_rank()))
            .max_by_key(|(_, rank)| *rank)
            .map(|(fid, _)| fid)?;

        self.history.remove(&victim);
        Some(victim)
    }

    /// Forget a frame entirely, whether or not it was evictable.
    pub fn remove(&mut self, frame_id: FrameId) {
        self.history.remove(&frame_id);
    }

    /// Number of frames currently marked evictable.
    pub fn size(&self) -> usize {
        self.history.values().filter(|h| h.evictable).count()
    }
}
