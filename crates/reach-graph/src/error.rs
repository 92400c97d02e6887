//! Graph-subsystem error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by `reach-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("OSM extract not found: {0}")]
    MissingExtract(PathBuf),

    #[error("OSM parse error: {0}")]
    Osm(String),

    #[error("extract produced an empty {0} graph")]
    EmptyGraph(&'static str),

    #[error("npy: {0}")]
    Npy(String),

    #[error("invalid node coordinate at index {0}")]
    BadCoordinate(usize),

    #[error("unsupported H3 resolution {0}")]
    BadResolution(u8),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;
