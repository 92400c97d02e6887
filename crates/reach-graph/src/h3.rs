//! Per-node H3 cell columns.
//!
//! Cells are computed once at the finest requested resolution and coarser
//! columns are derived through `parent()`, so the hierarchy is consistent by
//! construction: the r7 cell of a node is always the r7-parent of its r8
//! cell.  Computing each resolution independently from lat/lon does not
//! guarantee that (a node near a cell boundary can land in a non-parent
//! coarse cell), and downstream cross-resolution joins rely on it.

use h3o::{CellIndex, LatLng, Resolution};

use crate::error::{GraphError, GraphResult};

/// Compute one `u64` cell column per requested resolution.
///
/// Returns columns ascending by resolution.  Duplicate resolutions are
/// collapsed; an empty request yields no columns.
pub fn compute_h3_columns(
    lats: &[f32],
    lons: &[f32],
    resolutions: &[u8],
) -> GraphResult<Vec<(u8, Vec<u64>)>> {
    let mut res_sorted: Vec<u8> = resolutions.to_vec();
    res_sorted.sort_unstable();
    res_sorted.dedup();
    if res_sorted.is_empty() {
        return Ok(Vec::new());
    }

    let parsed: Vec<Resolution> = res_sorted
        .iter()
        .map(|&r| Resolution::try_from(r).map_err(|_| GraphError::BadResolution(r)))
        .collect::<GraphResult<_>>()?;
    let finest = *parsed.last().expect("non-empty");

    // Finest column straight from coordinates.
    let mut finest_cells = Vec::with_capacity(lats.len());
    for (i, (&lat, &lon)) in lats.iter().zip(lons).enumerate() {
        let ll = LatLng::new(lat as f64, lon as f64).map_err(|_| GraphError::BadCoordinate(i))?;
        finest_cells.push(ll.to_cell(finest));
    }

    // Coarser columns via parent() on the finest cells.
    let mut columns = Vec::with_capacity(parsed.len());
    for (&raw, &res) in res_sorted.iter().zip(&parsed) {
        let col: Vec<u64> = if res == finest {
            finest_cells.iter().map(|&c| u64::from(c)).collect()
        } else {
            finest_cells
                .iter()
                .map(|&c| u64::from(c.parent(res).expect("coarser than cell resolution")))
                .collect()
        };
        columns.push((raw, col));
    }
    Ok(columns)
}

/// Parent of a raw cell id at `res`, for validators that check the
/// hierarchy invariant on stored columns.
pub fn parent_cell(cell: u64, res: u8) -> GraphResult<u64> {
    let idx = CellIndex::try_from(cell)
        .map_err(|e| GraphError::Npy(format!("invalid H3 cell {cell:#x}: {e}")))?;
    let parsed = Resolution::try_from(res).map_err(|_| GraphError::BadResolution(res))?;
    idx.parent(parsed)
        .map(u64::from)
        .ok_or(GraphError::BadResolution(res))
}
