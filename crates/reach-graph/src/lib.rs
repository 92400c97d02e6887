//! `reach-graph` — OSM-derived road graph, weights, H3 columns, and cache.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                |
//! |----------------|---------------------------------------------------------|
//! | [`csr`]        | `RoadGraph` (CSR arrays), `GraphBuilder`, transpose     |
//! | [`osm`]        | PBF loading, mode profiles, access pruning              |
//! | [`speed`]      | `maxspeed` parsing and highway-class fallback speeds    |
//! | [`h3`]         | Hierarchical per-node H3 cell columns                   |
//! | [`cache`]      | npy cache directory, `meta.json` staleness, atomic IO   |
//! | [`npy`]        | NPY v1.0 codec + mmap read path                         |
//! | [`components`] | Weakly connected component labeling                     |
//! | [`snap`]       | R-tree nearest-node index                               |
//! | [`error`]      | `GraphError`, `GraphResult<T>`                          |

pub mod cache;
pub mod components;
pub mod csr;
pub mod error;
pub mod h3;
pub mod npy;
pub mod osm;
pub mod snap;
pub mod speed;

#[cfg(test)]
mod tests;

pub use cache::{cache_dir_for, file_mtime, load_or_build, CacheMeta};
pub use components::weakly_connected_components;
pub use csr::{build_reverse, GraphBuilder, ReverseCsr, RoadGraph};
pub use error::{GraphError, GraphResult};
pub use snap::SnapIndex;
