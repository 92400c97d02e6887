//! D_anchor-subsystem error type.

use thiserror::Error;

/// Errors produced by `reach-danchor`.
#[derive(Debug, Error)]
pub enum DanchorError {
    #[error("no targets to compute")]
    NoTargets,

    #[error("shard {target}: p95 of reachable seconds is {p95}s, over the {budget}s budget")]
    BudgetExceeded {
        target: String,
        p95: u16,
        budget: u16,
    },

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DanchorResult<T> = Result<T, DanchorError>;
