//! Write-once graph cache.
//!
//! A cache is a directory of flat `.npy` columns plus a `meta.json` record,
//! keyed by `(extract basename, mode)` and validated against the extract's
//! modification time.  Staleness of any kind — missing metadata, moved
//! mtime, missing hierarchical-H3 flag, missing resolution column — causes
//! a silent rebuild; it is never surfaced as an error.  A valid load never
//! rewrites any file, so rebuild-when-unchanged is byte-stable.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use reach_core::Mode;

use crate::csr::RoadGraph;
use crate::error::{GraphError, GraphResult};
use crate::h3::compute_h3_columns;
use crate::npy::{write_npy, Column};
use crate::osm::load_from_pbf;

/// Cache metadata, serialized as `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    /// Modification time (unix seconds) of the extract the cache was built
    /// from.  A mismatch invalidates the cache.
    pub extract_mtime: i64,
    pub mode: Mode,
    pub resolutions: Vec<u8>,
    /// Coarse H3 columns were derived from the finest via `parent()`.
    /// Older caches without this guarantee are rebuilt.
    pub hierarchical_h3: bool,
    /// Unix seconds at which the cache finished writing.
    pub cache_created: i64,
}

/// Deterministic cache directory for `(extract, mode)`.
pub fn cache_dir_for(cache_root: &Path, extract: &Path, mode: Mode) -> PathBuf {
    let stem = extract
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.split('.').next().unwrap_or(s))
        .unwrap_or("extract");
    cache_root.join(format!("{stem}_{mode}.npycache"))
}

/// Modification time of a file as unix seconds.
pub fn file_mtime(path: &Path) -> GraphResult<i64> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0))
}

fn now_unix() -> i64 {
    UNIX_EPOCH
        .elapsed()
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Load the cached graph for `(extract, mode)` if present and fresh,
/// otherwise parse the extract, compute H3 columns, and persist a new cache.
///
/// This is the single entry point every stage uses to obtain a graph.
pub fn load_or_build(
    extract: &Path,
    mode: Mode,
    resolutions: &[u8],
    cache_root: &Path,
) -> GraphResult<RoadGraph> {
    if !extract.is_file() {
        return Err(GraphError::MissingExtract(extract.to_path_buf()));
    }
    let dir = cache_dir_for(cache_root, extract, mode);
    let current_mtime = file_mtime(extract)?;

    match try_load(&dir, mode, resolutions, current_mtime) {
        Ok(graph) => {
            info!(cache = %dir.display(), mode = %mode, "loaded graph cache");
            return Ok(graph);
        }
        Err(reason) => {
            if dir.join("meta.json").exists() {
                warn!(cache = %dir.display(), %reason, "stale graph cache, rebuilding");
            }
        }
    }

    info!(extract = %extract.display(), mode = %mode, "building graph from extract");
    let mut graph = load_from_pbf(extract, mode)?;
    let columns = compute_h3_columns(&graph.lats, &graph.lons, resolutions)?;
    graph.h3_cells = columns
        .into_iter()
        .map(|(r, col)| (r, Column::from(col)))
        .collect();

    save(&dir, &graph, current_mtime)?;
    Ok(graph)
}

/// Attempt a cache load; any failure is reported as a rebuild reason, not an
/// error.
fn try_load(
    dir: &Path,
    mode: Mode,
    resolutions: &[u8],
    current_mtime: i64,
) -> Result<RoadGraph, String> {
    let meta_raw = fs::read_to_string(dir.join("meta.json")).map_err(|e| e.to_string())?;
    let meta: CacheMeta = serde_json::from_str(&meta_raw).map_err(|e| e.to_string())?;

    if meta.extract_mtime != current_mtime {
        return Err(format!(
            "extract mtime moved ({} != {})",
            meta.extract_mtime, current_mtime
        ));
    }
    if !meta.hierarchical_h3 {
        return Err("missing hierarchical_h3 flag".to_owned());
    }
    if meta.mode != mode {
        return Err(format!("cache mode {} != {mode}", meta.mode));
    }
    let mut wanted: Vec<u8> = resolutions.to_vec();
    wanted.sort_unstable();
    wanted.dedup();
    for r in &wanted {
        if !meta.resolutions.contains(r) {
            return Err(format!("missing H3 column for r{r}"));
        }
    }

    let open = |name: &str| dir.join(name);
    let graph = RoadGraph {
        mode,
        node_osm_id: Column::open(&open("node_ids.npy")).map_err(|e| e.to_string())?,
        lats: Column::open(&open("lats.npy")).map_err(|e| e.to_string())?,
        lons: Column::open(&open("lons.npy")).map_err(|e| e.to_string())?,
        h3_cells: wanted
            .iter()
            .map(|&r| {
                Column::open(&open(&format!("h3_r{r}.npy")))
                    .map(|c| (r, c))
                    .map_err(|e| e.to_string())
            })
            .collect::<Result<_, String>>()?,
        indptr: Column::open(&open("indptr.npy")).map_err(|e| e.to_string())?,
        indices: Column::open(&open("indices.npy")).map_err(|e| e.to_string())?,
        w_sec: Column::open(&open("w_sec.npy")).map_err(|e| e.to_string())?,
    };

    // Cheap structural sanity so a corrupt-but-parseable cache rebuilds
    // instead of panicking downstream.
    let n = graph.node_osm_id.len();
    if graph.indptr.len() != n + 1
        || graph.lats.len() != n
        || graph.lons.len() != n
        || graph.indices.len() != graph.w_sec.len()
        || graph.indptr.last().copied().unwrap_or(-1) as usize != graph.indices.len()
    {
        return Err("inconsistent array lengths".to_owned());
    }
    Ok(graph)
}

/// Persist the graph.  Each column is written atomically; `meta.json` is
/// written last so an interrupted save is just an invalid (meta-less) cache.
fn save(dir: &Path, graph: &RoadGraph, extract_mtime: i64) -> GraphResult<()> {
    fs::create_dir_all(dir)?;

    write_npy(&dir.join("node_ids.npy"), &graph.node_osm_id)?;
    write_npy(&dir.join("indptr.npy"), &graph.indptr)?;
    write_npy(&dir.join("indices.npy"), &graph.indices)?;
    write_npy(&dir.join("w_sec.npy"), &graph.w_sec)?;
    write_npy(&dir.join("lats.npy"), &graph.lats)?;
    write_npy(&dir.join("lons.npy"), &graph.lons)?;
    for (r, col) in &graph.h3_cells {
        write_npy(&dir.join(format!("h3_r{r}.npy")), col)?;
    }

    let meta = CacheMeta {
        extract_mtime,
        mode: graph.mode,
        resolutions: graph.h3_cells.iter().map(|(r, _)| *r).collect(),
        hierarchical_h3: true,
        cache_created: now_unix(),
    };
    let tmp = dir.join("meta.json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(&meta).expect("meta serializes"))?;
    fs::rename(&tmp, dir.join("meta.json"))?;

    info!(cache = %dir.display(), nodes = graph.node_count(), edges = graph.edge_count(), "wrote graph cache");
    Ok(())
}
