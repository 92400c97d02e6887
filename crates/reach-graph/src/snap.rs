//! Nearest-node snapping.
//!
//! An R-tree over equirectangular-projected node positions answers
//! k-nearest queries in planar metres.  Used by the anchor builder (POI →
//! site node) and by the custom-origin query (lat/lon → origin node).

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use reach_core::GeoPoint;

// ── R-tree entry ──────────────────────────────────────────────────────────────

/// A projected `[x_m, y_m]` point tagged with its node index.
#[derive(Clone)]
struct NodeEntry {
    point: [f64; 2],
    idx: u32,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared planar distance in metres².
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── SnapIndex ─────────────────────────────────────────────────────────────────

/// Spatial index over graph node positions.
pub struct SnapIndex {
    tree: RTree<NodeEntry>,
    cos_lat0: f64,
}

impl SnapIndex {
    /// Bulk-load the index from the graph's coordinate columns.
    ///
    /// The projection reference latitude is the mean node latitude, shared
    /// by every query against this index.
    pub fn build(lats: &[f32], lons: &[f32]) -> Self {
        let mean_lat = if lats.is_empty() {
            0.0
        } else {
            lats.iter().map(|&l| l as f64).sum::<f64>() / lats.len() as f64
        };
        let cos_lat0 = mean_lat.to_radians().cos();

        let entries: Vec<NodeEntry> = lats
            .iter()
            .zip(lons)
            .enumerate()
            .map(|(i, (&lat, &lon))| NodeEntry {
                point: GeoPoint::new(lat, lon).to_planar(cos_lat0),
                idx: i as u32,
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
            cos_lat0,
        }
    }

    /// Nearest node to `pos` as `(node index, distance in metres)`.
    ///
    /// Returns `None` only for an empty graph.
    pub fn nearest(&self, pos: GeoPoint) -> Option<(u32, f64)> {
        let q = pos.to_planar(self.cos_lat0);
        self.tree
            .nearest_neighbor(&q)
            .map(|e| (e.idx, e.distance_2(&q).sqrt()))
    }

    /// Up to `k` nearest nodes, ascending by distance.
    pub fn k_nearest(&self, pos: GeoPoint, k: usize) -> Vec<(u32, f64)> {
        let q = pos.to_planar(self.cos_lat0);
        self.tree
            .nearest_neighbor_iter(&q)
            .take(k)
            .map(|e| (e.idx, e.distance_2(&q).sqrt()))
            .collect()
    }
}
