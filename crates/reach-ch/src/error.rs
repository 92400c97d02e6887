//! CH-subsystem error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by `reach-ch`.
#[derive(Debug, Error)]
pub enum ChError {
    #[error("origin node {0} out of range")]
    BadOrigin(usize),

    #[error("anchor table not found: {0}")]
    MissingAnchors(PathBuf),

    #[error("graph: {0}")]
    Graph(#[from] reach_graph::GraphError),

    #[error("anchors: {0}")]
    Anchor(#[from] reach_anchor::AnchorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ChResult<T> = Result<T, ChError>;
