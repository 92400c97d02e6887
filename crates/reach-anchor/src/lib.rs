//! `reach-anchor` — anchor site construction and persistence.
//!
//! Anchors are graph nodes that stand in for one or more POIs.  This crate
//! turns a canonical POI table plus a road graph into the anchor site table
//! every later stage consumes:
//!
//! 1. snap each POI to a well-connected graph node within the mode's radius,
//! 2. collapse POIs sharing a node into one site (unioning brands and
//!    expanded categories),
//! 3. assign the dense `anchor_int_id` labelling by sorting sites on their
//!    stable UUID.
//!
//! | Module      | Contents                                          |
//! |-------------|---------------------------------------------------|
//! | [`poi`]     | `PoiRecord` + parquet reader                      |
//! | [`site`]    | Snapping, grouping, category expansion, IDs       |
//! | [`io`]      | Sites + id-map parquet writers and readers        |
//! | [`project`] | `AnchorProjection` of sites onto CSR node indices |
//! | [`error`]   | `AnchorError`, `AnchorResult<T>`                  |

pub mod error;
pub mod io;
pub mod poi;
pub mod project;
pub mod site;

#[cfg(test)]
mod tests;

pub use error::{AnchorError, AnchorResult};
pub use io::{read_sites_parquet, write_id_map_parquet, write_sites_parquet};
pub use poi::{read_poi_parquet, PoiRecord};
pub use project::AnchorProjection;
pub use site::{build_anchor_sites, AnchorSite, SnapReport};
