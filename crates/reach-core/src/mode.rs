//! Travel mode shared across every stage of the pipeline.
//!
//! The wire encoding is part of the artifact contract: Hive partition paths
//! and tile metadata carry `0` for driving and `2` for walking.  Codes 1 and
//! 3 are reserved for future modes.

use std::str::FromStr;

use crate::error::CoreError;

/// The travel mode a graph, anchor table, or artifact was built for.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Private vehicle on the drivable road network.
    Drive,
    /// On foot on the walkable network.
    Walk,
}

impl Mode {
    /// Wire code used in partition paths and tile metadata.
    #[inline]
    pub const fn code(self) -> u8 {
        match self {
            Mode::Drive => 0,
            Mode::Walk => 2,
        }
    }

    /// Inverse of [`code`](Self::code); rejects the reserved codes.
    pub fn from_code(code: u8) -> Result<Self, CoreError> {
        match code {
            0 => Ok(Mode::Drive),
            2 => Ok(Mode::Walk),
            other => Err(CoreError::Parse(format!("reserved mode code {other}"))),
        }
    }

    /// Human-readable label, used in CLI flags, cache paths, and parquet
    /// `mode` columns.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Drive => "drive",
            Mode::Walk => "walk",
        }
    }

    /// Maximum distance a POI may sit from its snapped graph node.
    ///
    /// Driving tolerates parking lots and service loops; walking must stay
    /// tight or storefronts snap across the street grid.
    #[inline]
    pub const fn snap_radius_m(self) -> f64 {
        match self {
            Mode::Drive => 250.0,
            Mode::Walk => 75.0,
        }
    }
}

impl FromStr for Mode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drive" => Ok(Mode::Drive),
            "walk" => Ok(Mode::Walk),
            other => Err(CoreError::Parse(format!("unknown mode {other:?}"))),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
