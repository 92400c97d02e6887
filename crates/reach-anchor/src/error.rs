//! Anchor-subsystem error type.

use thiserror::Error;

/// Errors produced by `reach-anchor`.
#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("POI table: {0}")]
    PoiTable(String),

    #[error("no anchor sites produced (all POIs unsnappable or out of scope)")]
    EmptySites,

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AnchorResult<T> = Result<T, AnchorError>;
