//! The contracted graph's array layout and persistence.
//!
//! Upward and downward halves are separate CSRs over the original node
//! index space.  Edge weights are `u32` (a shortcut's weight is a sum of
//! originals and can exceed the `u16` edge range); `mid` carries the
//! contracted middle node of a shortcut (`-1` for an original edge) and is
//! the unpacking table for consumers that need full paths.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use reach_core::Mode;
use reach_graph::npy::{read_npy, write_npy};
use reach_graph::GraphResult;

/// A contracted hierarchy over one graph.
pub struct ChGraph {
    /// Contraction order per node; higher rank = contracted later = more
    /// important.
    pub rank: Vec<u32>,

    // Upward half: edges into higher-ranked nodes.
    pub up_indptr: Vec<i64>,
    pub up_indices: Vec<i32>,
    pub up_weights: Vec<u32>,
    pub up_mid: Vec<i32>,

    // Downward half: edges into lower-ranked nodes.
    pub down_indptr: Vec<i64>,
    pub down_indices: Vec<i32>,
    pub down_weights: Vec<u32>,
    pub down_mid: Vec<i32>,

    /// Node indices in descending rank order — the PHAST sweep order.
    /// Derived from `rank`; not persisted.
    pub nodes_desc: Vec<u32>,
}

impl ChGraph {
    pub fn node_count(&self) -> usize {
        self.rank.len()
    }

    pub fn shortcut_count(&self) -> usize {
        self.up_mid.iter().filter(|&&m| m >= 0).count()
            + self.down_mid.iter().filter(|&&m| m >= 0).count()
    }

    /// Recompute the sweep order after construction or load.
    pub(crate) fn derive_sweep_order(rank: &[u32]) -> Vec<u32> {
        let mut order: Vec<u32> = (0..rank.len() as u32).collect();
        order.sort_unstable_by_key(|&u| std::cmp::Reverse(rank[u as usize]));
        order
    }
}

/// Identity of the graph a CH was built from.  A mismatch on load forces a
/// rebuild, exactly like the graph cache's own staleness rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChKey {
    pub extract_mtime: i64,
    pub mode: Mode,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Serialize, Deserialize)]
struct ChMeta {
    key: ChKey,
    shortcuts: usize,
}

/// Persist alongside the graph cache (`<graph cache>/ch_rev/`).
pub fn save_ch(dir: &Path, ch: &ChGraph, key: &ChKey) -> GraphResult<()> {
    fs::create_dir_all(dir)?;
    write_npy(&dir.join("rank.npy"), &ch.rank)?;
    write_npy(&dir.join("up_indptr.npy"), &ch.up_indptr)?;
    write_npy(&dir.join("up_indices.npy"), &ch.up_indices)?;
    write_npy(&dir.join("up_weights.npy"), &ch.up_weights)?;
    write_npy(&dir.join("up_mid.npy"), &ch.up_mid)?;
    write_npy(&dir.join("down_indptr.npy"), &ch.down_indptr)?;
    write_npy(&dir.join("down_indices.npy"), &ch.down_indices)?;
    write_npy(&dir.join("down_weights.npy"), &ch.down_weights)?;
    write_npy(&dir.join("down_mid.npy"), &ch.down_mid)?;

    let meta = ChMeta {
        key: key.clone(),
        shortcuts: ch.shortcut_count(),
    };
    let tmp = dir.join("meta.json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(&meta).expect("meta serializes"))?;
    fs::rename(&tmp, dir.join("meta.json"))?;
    info!(dir = %dir.display(), shortcuts = meta.shortcuts, "wrote CH cache");
    Ok(())
}

/// Load a CH cache if its key matches; `None` means rebuild.
pub fn load_ch(dir: &Path, key: &ChKey) -> Option<ChGraph> {
    let meta_raw = fs::read_to_string(dir.join("meta.json")).ok()?;
    let meta: ChMeta = serde_json::from_str(&meta_raw).ok()?;
    if &meta.key != key {
        return None;
    }

    let rank: Vec<u32> = read_npy(&dir.join("rank.npy")).ok()?;
    let nodes_desc = ChGraph::derive_sweep_order(&rank);
    Some(ChGraph {
        nodes_desc,
        rank,
        up_indptr: read_npy(&dir.join("up_indptr.npy")).ok()?,
        up_indices: read_npy(&dir.join("up_indices.npy")).ok()?,
        up_weights: read_npy(&dir.join("up_weights.npy")).ok()?,
        up_mid: read_npy(&dir.join("up_mid.npy")).ok()?,
        down_indptr: read_npy(&dir.join("down_indptr.npy")).ok()?,
        down_indices: read_npy(&dir.join("down_indices.npy")).ok()?,
        down_weights: read_npy(&dir.join("down_weights.npy")).ok()?,
        down_mid: read_npy(&dir.join("down_mid.npy")).ok()?,
    })
}
