//! Snapping, grouping, and labelling of anchor sites.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};
use uuid::Uuid;

use reach_core::{AnchorId, GeoPoint, Mode};
use reach_graph::{RoadGraph, SnapIndex};

use crate::error::{AnchorError, AnchorResult};
use crate::poi::PoiRecord;

/// Nearest-node candidates examined per POI.
const SNAP_CANDIDATES: usize = 10;
/// Candidates within this factor of the nearest distance stay in play.
const SNAP_DISTANCE_FACTOR: f64 = 2.0;
/// A node with at least this many outgoing edges is "well connected";
/// preferring one keeps anchors off dead-end service driveways.
const MIN_CONNECTED_DEGREE: u32 = 2;

/// One anchor site: a graph node standing in for one or more POIs.
#[derive(Debug, Clone)]
pub struct AnchorSite {
    /// `uuid5(DNS, "{mode}|{node_osm_id}")` — the stable identity sites are
    /// sorted by before numbering.
    pub site_id: String,
    pub node_osm_id: i64,
    pub lon: f64,
    pub lat: f64,
    pub poi_ids: Vec<String>,
    pub brands: Vec<String>,
    pub categories: Vec<String>,
    pub anchor_int_id: AnchorId,
}

/// Snap statistics for the stage's exit summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapReport {
    pub pois_total: usize,
    pub pois_anchorable: usize,
    pub pois_snapped: usize,
    pub pois_dropped_radius: usize,
    /// POIs moved off a dead-end onto a better-connected candidate.
    pub improved_connectivity: usize,
    pub snap_p50_m: f64,
    pub snap_p95_m: f64,
}

/// Expand one POI's categories.
///
/// A level-1 trauma designation (in `subcat` or `trauma_level`) contributes
/// both its specific label and the generic `hospital` label, so such
/// centers answer both "nearest hospital" and the trauma-specific filters.
fn expand_categories(poi: &PoiRecord, into: &mut BTreeSet<String>) {
    if let Some(cat) = &poi.category {
        into.insert(cat.clone());
    }
    for field in [&poi.subcat, &poi.trauma_level] {
        let Some(raw) = field else { continue };
        let alias = match raw.to_ascii_lowercase().as_str() {
            "trauma_level_1_adult" | "adult" => Some("trauma_level_1_adult"),
            "trauma_level_1_pediatric" | "pediatric" | "peds" => {
                Some("trauma_level_1_pediatric")
            }
            _ => None,
        };
        if let Some(alias) = alias {
            into.insert("hospital".to_owned());
            into.insert(alias.to_owned());
        }
    }
}

/// Pick the snapped node for one POI, or `None` when nothing lies within the
/// mode's radius.
///
/// Among candidates within twice the nearest distance, a well-connected node
/// is preferred over a leaf; ties on degree resolve to the nearer node.
fn select_node(
    candidates: &[(u32, f64)],
    out_degree: &[u32],
    radius_m: f64,
) -> Option<(u32, f64, bool)> {
    let &(nearest, nearest_dist) = candidates.first()?;
    if nearest_dist > radius_m {
        return None;
    }
    if out_degree[nearest as usize] >= MIN_CONNECTED_DEGREE {
        return Some((nearest, nearest_dist, false));
    }

    let window = nearest_dist * SNAP_DISTANCE_FACTOR;
    let mut best: Option<(u32, f64, u32)> = None;
    for &(idx, dist) in candidates {
        if dist > window || dist > radius_m {
            break; // candidates are ascending by distance
        }
        let deg = out_degree[idx as usize];
        if deg >= MIN_CONNECTED_DEGREE && best.is_none_or(|(_, _, bd)| deg > bd) {
            best = Some((idx, dist, deg));
        }
    }
    match best {
        Some((idx, dist, _)) => Some((idx, dist, true)),
        None => Some((nearest, nearest_dist, false)),
    }
}

/// Build the anchor site table for one `(mode, POI table, graph)` triple.
///
/// POIs beyond the snap radius are dropped silently (counted in the
/// report).  An empty result is an error — downstream stages cannot run
/// without anchors.
pub fn build_anchor_sites(
    pois: &[PoiRecord],
    graph: &RoadGraph,
    snap: &SnapIndex,
    mode: Mode,
) -> AnchorResult<(Vec<AnchorSite>, SnapReport)> {
    let out_degree = graph.out_degrees();
    let radius_m = mode.snap_radius_m();

    let mut report = SnapReport {
        pois_total: pois.len(),
        ..SnapReport::default()
    };

    struct Accum {
        poi_ids: Vec<String>,
        brands: Vec<String>,
        categories: BTreeSet<String>,
    }
    // BTreeMap keyed by node index → deterministic grouping order.
    let mut by_node: BTreeMap<u32, Accum> = BTreeMap::new();
    let mut snap_dists: Vec<f64> = Vec::new();

    for poi in pois {
        if !poi.is_anchorable() {
            continue;
        }
        report.pois_anchorable += 1;

        let candidates = snap.k_nearest(
            GeoPoint::new(poi.lat as f32, poi.lon as f32),
            SNAP_CANDIDATES,
        );
        let Some((node, dist, improved)) = select_node(&candidates, &out_degree, radius_m)
        else {
            report.pois_dropped_radius += 1;
            continue;
        };
        report.pois_snapped += 1;
        report.improved_connectivity += improved as usize;
        snap_dists.push(dist);

        let entry = by_node.entry(node).or_insert_with(|| Accum {
            poi_ids: Vec::new(),
            brands: Vec::new(),
            categories: BTreeSet::new(),
        });
        if !entry.poi_ids.contains(&poi.poi_id) {
            entry.poi_ids.push(poi.poi_id.clone());
        }
        if let Some(brand) = &poi.brand_id {
            if !entry.brands.contains(brand) {
                entry.brands.push(brand.clone());
            }
        }
        expand_categories(poi, &mut entry.categories);
    }

    if by_node.is_empty() {
        return Err(AnchorError::EmptySites);
    }

    let mut sites: Vec<AnchorSite> = by_node
        .into_iter()
        .map(|(node, accum)| {
            let node = node as usize;
            let osm_id = graph.node_osm_id[node];
            AnchorSite {
                site_id: Uuid::new_v5(
                    &Uuid::NAMESPACE_DNS,
                    format!("{mode}|{osm_id}").as_bytes(),
                )
                .to_string(),
                node_osm_id: osm_id,
                lon: graph.lons[node] as f64,
                lat: graph.lats[node] as f64,
                poi_ids: accum.poi_ids,
                brands: accum.brands,
                categories: accum.categories.into_iter().collect(),
                anchor_int_id: AnchorId::INVALID,
            }
        })
        .collect();

    // Stable labelling: sort by the UUID string, number from zero.
    sites.sort_by(|a, b| a.site_id.cmp(&b.site_id));
    for (i, site) in sites.iter_mut().enumerate() {
        site.anchor_int_id = AnchorId(i as u32);
    }

    snap_dists.sort_by(f64::total_cmp);
    report.snap_p50_m = percentile(&snap_dists, 0.50);
    report.snap_p95_m = percentile(&snap_dists, 0.95);

    if report.pois_dropped_radius > 0 {
        warn!(
            dropped = report.pois_dropped_radius,
            radius_m, "POIs beyond snap radius"
        );
    }
    info!(
        sites = sites.len(),
        snapped = report.pois_snapped,
        p95_m = report.snap_p95_m,
        "built anchor sites"
    );
    Ok((sites, report))
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = (sorted.len() - 1) as f64 * q;
    sorted[pos.round() as usize]
}
