//! `reach-hex` — the T_hex engine.
//!
//! Collapses node-level K-best anchor labels into per-hex K-best rows at
//! each requested H3 resolution, optionally borrowing candidates from
//! ring-1 neighbors for sparse cells, and writes the long- and wide-form
//! parquet artifacts.
//!
//! | Module    | Contents                                      |
//! |-----------|-----------------------------------------------|
//! | [`agg`]   | Aggregation, borrowing, tie-breaking          |
//! | [`row`]   | `HexRow` / `HexSlot` wide-form rows           |
//! | [`io`]    | Long + wide parquet writers                   |
//! | [`error`] | `HexError`, `HexResult<T>`                    |

pub mod agg;
pub mod error;
pub mod io;
pub mod row;


pub use agg::aggregate;
pub use error::{HexError, HexResult};
pub use io::{write_long_parquet, write_wide_parquet};
pub use row::{HexRow, HexSlot, FLAG_BORROWED};
