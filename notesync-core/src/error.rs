//! Error types shared by the storage-facing modules.
//!
//! Pure components (anchoring, diffing, tracking) are total and have no
//! error type at all. Storage operations return `StoreError`; an optimistic
//! write that loses its race is reported as a value ([`crate::store::PutResult::Conflict`])
//! where the caller has a sensible boolean fallback, and as
//! [`StoreError::Conflict`] where it does not.

use thiserror::Error;

/// Failures surfaced by the document store and the local ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[from] tokio_rusqlite::Error),

    #[error("malformed document body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("write conflicted with a newer revision")]
    Conflict,
}
