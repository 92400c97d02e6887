//! Hex-aggregation error type.

use thiserror::Error;

/// Errors produced by `reach-hex`.
#[derive(Debug, Error)]
pub enum HexError {
    #[error("invalid H3 cell {0:#x}")]
    BadCell(u64),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HexResult<T> = Result<T, HexError>;
