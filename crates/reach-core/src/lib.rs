//! `reach-core` — foundational types for the `reach` accessibility engine.
//!
//! This crate is a dependency of every other `reach-*` crate.  It
//! intentionally has no `reach-*` dependencies and minimal external ones
//! (only `thiserror` and `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                              |
//! |--------------|-------------------------------------------------------|
//! | [`ids`]      | `AnchorId`, `CategoryId`, `NodeIdx`                   |
//! | [`geo`]      | `GeoPoint`, haversine + equirectangular projection    |
//! | [`mode`]     | `Mode` (drive/walk) with wire codes and snap radii    |
//! | [`sentinel`] | `UNREACH_U16`, `NODATA_U16`, seconds clamping         |
//! | [`config`]   | Environment-variable overrides (`TS_*`)               |
//! | [`error`]    | `CoreError`, `CoreResult`                             |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod mode;
pub mod sentinel;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::{GeoPoint, M_PER_DEG};
pub use ids::{AnchorId, CategoryId, NodeIdx};
pub use mode::Mode;
pub use sentinel::{clamp_seconds, narrow_query_seconds, NODATA_U16, UNREACH_U16, UNREACH_U32};
