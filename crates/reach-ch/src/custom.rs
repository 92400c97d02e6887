//! Custom-origin queries: `{anchor_int_id → seconds}` for an arbitrary
//! point.
//!
//! This is the surface the HTTP layer calls.  Per mode, everything heavy —
//! graph, snap index, CH, anchor projection — is loaded once into a
//! process-wide cache at first request and never mutated afterwards.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use rustc_hash::FxHashMap;
use tracing::info;

use reach_anchor::{read_sites_parquet, AnchorProjection};
use reach_core::{config, narrow_query_seconds, GeoPoint, Mode, UNREACH_U16};
use reach_graph::{cache_dir_for, file_mtime, load_or_build, RoadGraph, SnapIndex};

use crate::contraction::build_ch;
use crate::error::{ChError, ChResult};
use crate::graph::{load_ch, save_ch, ChGraph, ChKey};
use crate::phast::PhastQuery;

/// Straight-line speed bound used by the anchor prefilter, metres/minute.
/// Generous against any real road speed so the prefilter never excludes a
/// reachable anchor.
const PREFILTER_M_PER_MIN: f64 = 1_500.0;
const PREFILTER_PAD: f64 = 1.4;

/// Everything one mode needs to answer custom-origin queries.
pub struct CustomOriginService {
    mode: Mode,
    snap: SnapIndex,
    ch: ChGraph,
    anchor_nodes: Vec<u32>,
    anchor_ids: Vec<u32>,
    anchor_pos: Vec<GeoPoint>,
}

impl CustomOriginService {
    /// Load (or build) all per-mode state from explicit paths.
    ///
    /// The CH is constructed over the **reverse** CSR, so a single PHAST
    /// sweep from the snapped point yields anchor→point seconds on the
    /// forward graph — the custom D_anchor column.  It is cached under the
    /// graph cache directory and keyed by the graph's identity.
    pub fn load(
        extract: &Path,
        sites_path: &Path,
        mode: Mode,
        resolutions: &[u8],
        cache_root: &Path,
    ) -> ChResult<Self> {
        if !sites_path.is_file() {
            return Err(ChError::MissingAnchors(sites_path.to_path_buf()));
        }
        let graph = load_or_build(extract, mode, resolutions, cache_root)?;
        let snap = SnapIndex::build(&graph.lats, &graph.lons);

        let sites = read_sites_parquet(sites_path)?;
        let projection = AnchorProjection::build(&sites, &graph);

        let ch = load_or_build_ch(&graph, extract, mode, cache_root)?;
        info!(mode = %mode, anchors = projection.len(), "custom-origin service ready");

        Ok(Self {
            mode,
            snap,
            ch,
            anchor_ids: projection.anchor_ids.iter().map(|a| a.0).collect(),
            anchor_nodes: projection.anchor_nodes,
            anchor_pos: projection.positions,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// One-off D_anchor for a custom point.
    ///
    /// Anchors outside a straight-line radius of
    /// `overflow_min × 1500 m/min × 1.4` are reported unreachable without
    /// touching the CH; the rest go through one PHAST query limited to
    /// `max(cutoff, overflow) × 60` seconds.
    pub fn custom_d_anchor(
        &self,
        lon: f64,
        lat: f64,
        cutoff_min: u32,
        overflow_min: u32,
    ) -> ChResult<FxHashMap<u32, u16>> {
        let mut out: FxHashMap<u32, u16> =
            self.anchor_ids.iter().map(|&a| (a, UNREACH_U16)).collect();
        if self.anchor_nodes.is_empty() {
            return Ok(out);
        }

        let origin_pos = GeoPoint::new(lat as f32, lon as f32);
        let Some((origin, _)) = self.snap.nearest(origin_pos) else {
            return Ok(out);
        };

        let minutes = cutoff_min.max(overflow_min);
        let keep = prefilter_anchors(&self.anchor_pos, origin_pos, minutes as f64);
        let subset: Vec<u32> = keep.iter().map(|&i| self.anchor_nodes[i]).collect();

        let limit_s = minutes * 60;
        let mut query = PhastQuery::new(&self.ch);
        let seconds = query.query_subset(&self.ch, origin as usize, &subset, limit_s)?;

        for (&i, &raw) in keep.iter().zip(&seconds) {
            out.insert(self.anchor_ids[i], narrow_query_seconds(raw));
        }
        Ok(out)
    }
}

/// Indices of anchors within the planar prefilter radius for `minutes`.
pub fn prefilter_anchors(positions: &[GeoPoint], origin: GeoPoint, minutes: f64) -> Vec<usize> {
    if minutes <= 0.0 {
        return Vec::new();
    }
    let radius_m = minutes * PREFILTER_M_PER_MIN * PREFILTER_PAD;
    let radius2 = radius_m * radius_m;
    let cos_lat0 = (origin.lat as f64).to_radians().cos().max(1e-4);

    let [ox, oy] = origin.to_planar(cos_lat0);
    positions
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            let [x, y] = p.to_planar(cos_lat0);
            let (dx, dy) = (x - ox, y - oy);
            dx * dx + dy * dy <= radius2
        })
        .map(|(i, _)| i)
        .collect()
}

/// Build (or load) the reverse-graph CH for a cached graph.
pub fn load_or_build_ch(
    graph: &RoadGraph,
    extract: &Path,
    mode: Mode,
    cache_root: &Path,
) -> ChResult<ChGraph> {
    let key = ChKey {
        extract_mtime: file_mtime(extract)?,
        mode,
        nodes: graph.node_count(),
        edges: graph.edge_count(),
    };
    let dir = cache_dir_for(cache_root, extract, mode).join("ch_rev");

    if let Some(ch) = load_ch(&dir, &key) {
        info!(dir = %dir.display(), "loaded CH cache");
        return Ok(ch);
    }

    info!(mode = %mode, "building contraction hierarchy over reverse graph");
    let rev = graph.reverse();
    let ch = build_ch(&rev.indptr, &rev.indices, &rev.w_sec);
    save_ch(&dir, &ch, &key)?;
    Ok(ch)
}

// ── Process-wide per-mode cache ───────────────────────────────────────────────

static SERVICES: OnceLock<Mutex<FxHashMap<u8, Arc<CustomOriginService>>>> = OnceLock::new();

/// Resolve the per-mode service from the `TS_STATE` layout, loading it on
/// first use.  This is the in-process entry point the serving layer binds.
pub fn service_for_mode(mode: Mode) -> ChResult<Arc<CustomOriginService>> {
    let cache = SERVICES.get_or_init(|| Mutex::new(FxHashMap::default()));
    let mut guard = cache.lock().expect("service cache poisoned");
    if let Some(svc) = guard.get(&mode.code()) {
        return Ok(Arc::clone(svc));
    }

    let state = config::active_state();
    let extract = PathBuf::from(format!("data/osm/{state}.osm.pbf"));
    let sites = PathBuf::from(format!("data/anchors/{state}_{mode}_sites.parquet"));
    let cache_root = PathBuf::from("data/osm/cache_csr");

    let svc = Arc::new(CustomOriginService::load(
        &extract,
        &sites,
        mode,
        &[7, 8],
        &cache_root,
    )?);
    guard.insert(mode.code(), Arc::clone(&svc));
    Ok(svc)
}
