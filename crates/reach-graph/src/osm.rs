//! OSM PBF loader.
//!
//! # What is loaded
//!
//! Ways carrying a `highway` tag admitted by the mode profile, minus
//! anything tagged `access=private` or `access=no` (scalar or `;`-list).
//! One-way ways emit a single directed edge per segment; everything else
//! emits both directions with identical weight.
//!
//! # Memory note
//!
//! The loader buffers all OSM node coordinates in an `FxHashMap<i64, _>`
//! for the first pass (ways reference nodes by OSM integer ID).  The map is
//! dropped before CSR construction.  Dense node indices are assigned in
//! ascending OSM-id order so rebuilds from an unchanged extract are
//! byte-identical.

use std::path::Path;

use osmpbf::{Element, ElementReader};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::info;

use reach_core::{GeoPoint, Mode};

use crate::csr::{GraphBuilder, RoadGraph};
use crate::error::{GraphError, GraphResult};
use crate::speed::{drive_mps, segment_seconds, WALK_MPS};

// ── Public entry point ────────────────────────────────────────────────────────

/// Build a [`RoadGraph`] (without H3 columns) from an OSM extract.
///
/// # Errors
///
/// [`GraphError::MissingExtract`] when the path does not exist — a fatal
/// input error per the pipeline contract — and [`GraphError::Osm`] on parse
/// failures.
pub fn load_from_pbf(path: &Path, mode: Mode) -> GraphResult<RoadGraph> {
    if !path.is_file() {
        return Err(GraphError::MissingExtract(path.to_path_buf()));
    }

    // ── Pass 1: collect node coordinates and admissible ways ──────────────
    let reader = ElementReader::from_path(path).map_err(|e| GraphError::Osm(e.to_string()))?;

    let mut all_nodes: FxHashMap<i64, GeoPoint> = FxHashMap::default();
    let mut ways: Vec<OsmWay> = Vec::new();

    reader
        .for_each(|elem| match elem {
            Element::Node(n) => {
                all_nodes.insert(n.id(), GeoPoint::new(n.lat() as f32, n.lon() as f32));
            }
            Element::DenseNode(n) => {
                all_nodes.insert(n.id(), GeoPoint::new(n.lat() as f32, n.lon() as f32));
            }
            Element::Way(w) => {
                // Collect tags eagerly so &str lifetimes don't escape the closure.
                let tags: Vec<(&str, &str)> = w.tags().collect();
                let Some(highway) = tag(&tags, "highway") else {
                    return;
                };
                if !mode_admits(mode, highway) || access_denied(tag(&tags, "access")) {
                    return;
                }

                let speed_mps = match mode {
                    Mode::Drive => drive_mps(tag(&tags, "maxspeed"), highway),
                    Mode::Walk => WALK_MPS,
                };
                ways.push(OsmWay {
                    refs: w.refs().collect(),
                    speed_mps,
                    oneway: mode == Mode::Drive && is_oneway(highway, &tags),
                });
            }
            _ => {}
        })
        .map_err(|e| GraphError::Osm(e.to_string()))?;

    if ways.is_empty() {
        return Err(GraphError::EmptyGraph(mode.as_str()));
    }

    // ── Pass 2: dense node indices in ascending OSM-id order ──────────────
    let road_node_ids: FxHashSet<i64> = ways.iter().flat_map(|w| w.refs.iter().copied()).collect();
    let mut sorted_ids: Vec<i64> = road_node_ids
        .into_iter()
        .filter(|id| all_nodes.contains_key(id))
        .collect();
    sorted_ids.sort_unstable();

    let mut builder = GraphBuilder::with_capacity(mode, sorted_ids.len(), sorted_ids.len() * 2);
    let mut osm_to_idx: FxHashMap<i64, u32> = FxHashMap::default();
    osm_to_idx.reserve(sorted_ids.len());
    for osm_id in &sorted_ids {
        let idx = builder.add_node(*osm_id, all_nodes[osm_id]);
        osm_to_idx.insert(*osm_id, idx);
    }
    drop(all_nodes);

    // ── Pass 3: segment edges with travel-time weights ────────────────────
    for way in &ways {
        for window in way.refs.windows(2) {
            let (Some(&from), Some(&to)) =
                (osm_to_idx.get(&window[0]), osm_to_idx.get(&window[1]))
            else {
                continue;
            };
            if from == to {
                continue;
            }
            let len_m = builder.node_pos(from).distance_m(builder.node_pos(to)) as f64;
            let w = segment_seconds(len_m, way.speed_mps);

            if way.oneway {
                builder.add_directed_edge(from, to, w)?;
            } else {
                builder.add_road(from, to, w)?;
            }
        }
    }

    info!(
        mode = mode.as_str(),
        nodes = builder.node_count(),
        edges = builder.edge_count(),
        "parsed extract"
    );

    if builder.edge_count() == 0 {
        return Err(GraphError::EmptyGraph(mode.as_str()));
    }
    Ok(builder.build())
}

// ── Internal types ────────────────────────────────────────────────────────────

struct OsmWay {
    refs: Vec<i64>,
    speed_mps: f64,
    oneway: bool,
}

// ── Tag helpers ───────────────────────────────────────────────────────────────

fn tag<'a>(tags: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Whether a `highway` class belongs in this mode's network.
pub fn mode_admits(mode: Mode, highway: &str) -> bool {
    match mode {
        Mode::Drive => !matches!(
            highway,
            "footway"
                | "path"
                | "cycleway"
                | "pedestrian"
                | "steps"
                | "bridleway"
                | "corridor"
                | "platform"
                | "proposed"
                | "construction"
        ),
        Mode::Walk => !matches!(
            highway,
            "motorway" | "motorway_link" | "trunk" | "trunk_link" | "proposed" | "construction"
        ),
    }
}

/// `access=private` or `access=no`, tolerating `;`-separated lists.
pub fn access_denied(access: Option<&str>) -> bool {
    let Some(raw) = access else { return false };
    raw.split(';')
        .map(|t| t.trim())
        .any(|t| t.eq_ignore_ascii_case("private") || t.eq_ignore_ascii_case("no"))
}

/// One-way for car traffic: explicit `oneway=yes|true|1`, or implicit on
/// motorways per OSM convention.
fn is_oneway(highway: &str, tags: &[(&str, &str)]) -> bool {
    let explicit = tags
        .iter()
        .any(|(k, v)| *k == "oneway" && matches!(*v, "yes" | "1" | "true"));
    explicit || matches!(highway, "motorway" | "motorway_link")
}
