//! `reach-danchor` — the D_anchor engine.
//!
//! For each target (one category label or one brand id) and each anchor:
//! the travel time from the anchor to the nearest instance of the target,
//! or null when unreachable within the overflow cutoff.  One Hive-
//! partitioned parquet shard per `(mode, target)`.
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | [`context`] | Shared read-only graph context (transpose, components)|
//! | [`targets`] | Target resolution, category ids, allowlist, layout    |
//! | [`shard`]   | Shard rows, stats, Hive parquet writer                |
//! | [`driver`]  | Per-target tasks on the bounded worker pool           |
//! | [`error`]   | `DanchorError`, `DanchorResult<T>`                    |

pub mod context;
pub mod driver;
pub mod error;
pub mod shard;
pub mod targets;


pub use context::GraphContext;
pub use driver::{compute_all, DriverParams, ShardOutcome, P95_BUDGET_S};
pub use error::{DanchorError, DanchorResult};
pub use shard::{ShardRow, ShardStats};
pub use targets::{
    assign_category_ids, brand_spec, categories_in_sites, category_specs, matching_sites,
    read_allowlist, write_labels_json, TargetKind, TargetSpec,
};
