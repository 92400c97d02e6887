//! Projection of anchor sites onto CSR node indices.
//!
//! Sites reference nodes by OSM id; the search kernels speak dense CSR
//! indices.  The projection resolves one to the other once per run and is
//! shared read-only across workers.  A site whose node is absent from the
//! graph (different extract vintage, pruned access road) is dropped with a
//! warning — a mapping error, not a failure.

use tracing::warn;

use reach_core::{AnchorId, GeoPoint};
use reach_graph::RoadGraph;

use crate::site::AnchorSite;

/// Anchor sites resolved to CSR node indices.
pub struct AnchorProjection {
    /// CSR node index per projected site, parallel with `anchor_ids`,
    /// ascending by node index.
    pub anchor_nodes: Vec<u32>,
    /// Anchor id per projected site.
    pub anchor_ids: Vec<AnchorId>,
    /// Node position per projected site (for radius prefilters).
    pub positions: Vec<GeoPoint>,
    /// Indices into the original `sites` slice, parallel with the above.
    pub site_index: Vec<usize>,
    /// Sites whose node was not found in the graph.
    pub dropped: usize,
}

impl AnchorProjection {
    /// Resolve `sites` against the graph's `node_osm_id` column (sorted
    /// ascending by construction, so lookup is a binary search).
    pub fn build(sites: &[AnchorSite], graph: &RoadGraph) -> Self {
        let osm_ids: &[i64] = &graph.node_osm_id;

        let mut entries: Vec<(u32, AnchorId, GeoPoint, usize)> = Vec::with_capacity(sites.len());
        let mut dropped = 0usize;
        for (i, site) in sites.iter().enumerate() {
            match osm_ids.binary_search(&site.node_osm_id) {
                Ok(idx) => entries.push((
                    idx as u32,
                    site.anchor_int_id,
                    graph.position(idx),
                    i,
                )),
                Err(_) => {
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            warn!(dropped, total = sites.len(), "anchor sites not in graph");
        }

        entries.sort_unstable_by_key(|&(node, _, _, _)| node);

        Self {
            anchor_nodes: entries.iter().map(|e| e.0).collect(),
            anchor_ids: entries.iter().map(|e| e.1).collect(),
            positions: entries.iter().map(|e| e.2).collect(),
            site_index: entries.iter().map(|e| e.3).collect(),
            dropped,
        }
    }

    pub fn len(&self) -> usize {
        self.anchor_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchor_nodes.is_empty()
    }
}
