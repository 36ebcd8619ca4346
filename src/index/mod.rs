//! Index layer: a collaborator contract boundary (no B+-tree algorithm
//! ships here) plus a small persistent trie used and tested in its own
//! right (SPEC_FULL §6, §9 supplement).

pub mod contract;
pub mod trie;

pub use contract::Index;
pub use trie::Trie;
