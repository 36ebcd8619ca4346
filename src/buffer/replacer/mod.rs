//! Eviction policy implementation (replacer).
//!
//! - [`LruKReplacer`] — backward k-distance based eviction.

mod lru_k;

pub use lru_k::LruKReplacer;
