//! Environment-variable overrides shared by the pipeline stages.
//!
//! These mirror the deployment contract: the serving process and the batch
//! stages agree on artifact locations through `TS_*` variables, falling back
//! to the repository-relative defaults.

use std::env;
use std::path::PathBuf;

/// Active state slug (e.g. `massachusetts`), used to locate extracts and
/// anchor tables when a stage is not given explicit paths.
pub const ENV_STATE: &str = "TS_STATE";

/// Override for the category D_anchor output root.
pub const ENV_DANCHOR_CATEGORY_DIR: &str = "TS_DANCHOR_CATEGORY_DIR";

/// Override for the brand D_anchor output root.
pub const ENV_DANCHOR_BRAND_DIR: &str = "TS_DANCHOR_BRAND_DIR";

pub fn active_state() -> String {
    env::var(ENV_STATE).unwrap_or_else(|_| "massachusetts".to_owned())
}

pub fn danchor_category_dir() -> PathBuf {
    env::var_os(ENV_DANCHOR_CATEGORY_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/d_anchor_category"))
}

pub fn danchor_brand_dir() -> PathBuf {
    env::var_os(ENV_DANCHOR_BRAND_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/d_anchor"))
}
