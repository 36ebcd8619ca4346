//! Error types for InterchangeDB.

use thiserror::Error;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors surfaced by the storage layer.
///
/// The buffer pool never throws: every public operation either returns
/// `Ok`/`Some` or one of these variants, so callers can match instead of
/// catching.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk.
    #[error("page {0} not found")]
    PageNotFound(i32),

    /// Buffer pool has no free frames and cannot evict any pages.
    #[error("no free frames available in buffer pool")]
    NoFreeFrames,

    /// The provided page ID is invalid (e.g. the `INVALID_PAGE_ID` sentinel).
    #[error("invalid page id: {0}")]
    InvalidPageId(i32),

    /// Attempted to delete or otherwise touch a page that is still pinned.
    #[error("page {0} is still pinned")]
    PagePinned(i32),

    /// Attempted to unpin a page that wasn't pinned (pin count already zero).
    #[error("page {0} is not pinned")]
    PageNotPinned(i32),
}
