//! Node-label → hex aggregation.
//!
//! Every node contributes its K-best anchor labels to the hex it sits in;
//! each hex then keeps the per-anchor minimum and the global top-K ordered
//! by `(seconds, anchor_id)`.  Optionally, hexes short of K borrow the
//! candidates of their six ring-1 neighbors, with provenance marked per
//! slot.
//!
//! Tie-breaking is fully deterministic: equal `(seconds, anchor_id)`
//! candidates prefer the non-borrowed one, and anchor id orders equal-time
//! candidates, so identical inputs always reproduce identical rows.

use h3o::CellIndex;
use rustc_hash::FxHashMap;
use tracing::debug;

use reach_core::NODATA_U16;
use reach_kernel::{KBestLabels, NO_SOURCE};

use crate::error::{HexError, HexResult};
use crate::row::{HexRow, HexSlot, FLAG_BORROWED};

#[derive(Debug, Clone, Copy)]
struct Candidate {
    seconds: u16,
    anchor_id: i32,
    borrowed: bool,
}

#[derive(Default)]
struct Bucket {
    /// The hex contains at least one road node (as opposed to existing only
    /// as a borrow placeholder around covered hexes).
    has_node: bool,
    own: Vec<Candidate>,
}

/// Aggregate node labels into wide rows at one resolution.
///
/// * `labels` — kernel output over the graph's nodes.
/// * `node_anchor` — anchor id per node index (`-1` for non-anchor nodes);
///   maps label sources to anchor ids.
/// * `h3_cells` — the graph's precomputed cell column at `res`.
///
/// Rows come back sorted by `h3_id` so reruns are byte-identical.
pub fn aggregate(
    labels: &KBestLabels,
    node_anchor: &[i32],
    h3_cells: &[u64],
    res: u8,
    borrow: bool,
) -> HexResult<Vec<HexRow>> {
    let k = labels.k();
    assert_eq!(labels.node_count(), h3_cells.len(), "label/cell length mismatch");

    // ── Collect per-hex candidates ────────────────────────────────────────
    let mut buckets: FxHashMap<u64, Bucket> = FxHashMap::default();
    for u in 0..labels.node_count() {
        let bucket = buckets.entry(h3_cells[u]).or_default();
        bucket.has_node = true;

        let (srcs, secs) = labels.node(u);
        for i in 0..k {
            if srcs[i] == NO_SOURCE {
                break;
            }
            let anchor_id = node_anchor[srcs[i] as usize];
            if anchor_id < 0 {
                continue; // label source is not an anchor node
            }
            bucket.own.push(Candidate {
                seconds: secs[i],
                anchor_id,
                borrowed: false,
            });
        }
    }

    // ── Borrow universe: ring-1 neighbors of occupied hexes ───────────────
    if borrow {
        let occupied: Vec<u64> = buckets
            .iter()
            .filter(|(_, b)| !b.own.is_empty())
            .map(|(&h, _)| h)
            .collect();
        for h in occupied {
            for nb in ring1(h)? {
                buckets.entry(nb).or_default();
            }
        }
    }

    // ── Reduce each hex, borrowing where short of K ───────────────────────
    // Neighbor lookups read `own` candidates only, so reduction order never
    // affects results.
    let mut rows = Vec::with_capacity(buckets.len());
    let mut borrowed_hexes = 0usize;
    let hexes: Vec<u64> = buckets.keys().copied().collect();
    for h in hexes {
        let bucket = &buckets[&h];
        let mut chosen = top_k(&bucket.own, k);

        if borrow && chosen.len() < k {
            let mut pool = bucket.own.clone();
            for nb in ring1(h)? {
                if let Some(nbucket) = buckets.get(&nb) {
                    // Cap the contribution at the neighbor's own top-K so a
                    // dense neighbor cannot flood the candidate pool.
                    pool.extend(top_k(&nbucket.own, k).into_iter().map(|mut c| {
                        c.borrowed = true;
                        c
                    }));
                }
            }
            let with_borrow = top_k(&pool, k);
            if with_borrow.iter().any(|c| c.borrowed) {
                borrowed_hexes += 1;
            }
            chosen = with_borrow;
        }

        if chosen.is_empty() && !bucket.has_node {
            // A placeholder whose whole neighborhood had nothing to lend:
            // no road node, no data.
            let mut slots = vec![HexSlot::EMPTY; k];
            slots[0].seconds = NODATA_U16;
            rows.push(HexRow::new(h, res, slots));
            continue;
        }

        let mut slots = vec![HexSlot::EMPTY; k];
        for (i, c) in chosen.iter().enumerate() {
            slots[i] = HexSlot {
                anchor_id: c.anchor_id,
                seconds: c.seconds,
                flags: if c.borrowed { FLAG_BORROWED } else { 0 },
            };
        }
        rows.push(HexRow::new(h, res, slots));
    }

    rows.sort_unstable_by_key(|r| r.h3_id);
    debug!(res, hexes = rows.len(), borrowed_hexes, "aggregated hex rows");
    Ok(rows)
}

/// Per-anchor min, then ascending `(seconds, anchor_id)`, non-borrowed
/// preferred on full ties; truncated to `k` distinct anchors.
fn top_k(candidates: &[Candidate], k: usize) -> Vec<Candidate> {
    let mut sorted: Vec<Candidate> = candidates.to_vec();
    sorted.sort_unstable_by_key(|c| (c.seconds, c.anchor_id, c.borrowed));

    let mut out: Vec<Candidate> = Vec::with_capacity(k);
    for c in sorted {
        if out.len() == k {
            break;
        }
        if out.iter().all(|kept| kept.anchor_id != c.anchor_id) {
            out.push(c);
        }
    }
    out
}

/// The six ring-1 neighbors of a cell (center excluded).
fn ring1(h: u64) -> HexResult<impl Iterator<Item = u64>> {
    let cell = CellIndex::try_from(h).map_err(|_| HexError::BadCell(h))?;
    let cells: Vec<CellIndex> = cell.grid_disk(1);
    Ok(cells
        .into_iter()
        .filter(move |&c| c != cell)
        .map(u64::from))
}
