//! `reach-ch` — contraction hierarchy and custom-origin queries.
//!
//! Offline, once per mode: contract the reverse road graph into an
//! upward/downward CSR pair with a shortcut-unpacking table, persisted next
//! to the graph cache.  Online: a bounded upward Dijkstra plus one linear
//! downward sweep answers "seconds from this arbitrary point to every
//! anchor" in interactive time.
//!
//! | Module          | Contents                                         |
//! |-----------------|--------------------------------------------------|
//! | [`contraction`] | Node ordering, witness search, shortcut creation |
//! | [`graph`]       | `ChGraph` arrays + npy persistence               |
//! | [`phast`]       | `PhastQuery::query_subset`                       |
//! | [`custom`]      | Anchor prefilter + `custom_d_anchor` service     |
//! | [`error`]       | `ChError`, `ChResult<T>`                         |

pub mod contraction;
pub mod custom;
pub mod error;
pub mod graph;
pub mod phast;

#[cfg(test)]
mod tests;

pub use contraction::build_ch;
pub use custom::{
    load_or_build_ch, prefilter_anchors, service_for_mode, CustomOriginService,
};
pub use error::{ChError, ChResult};
pub use graph::{load_ch, save_ch, ChGraph, ChKey};
pub use phast::PhastQuery;
