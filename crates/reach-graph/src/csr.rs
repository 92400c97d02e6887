//! Road graph representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a node index `u`, its outgoing edges occupy the slice:
//!
//! ```text
//! indices[ indptr[u] .. indptr[u+1] ]     destination node indices
//! w_sec  [ indptr[u] .. indptr[u+1] ]     travel time, u16 seconds
//! ```
//!
//! Array element types match the on-disk cache exactly (`i64` row pointer,
//! `i32` destinations, `u16` weights) so cached columns can be memory-mapped
//! in place.  Node attributes are parallel arrays over the same index space;
//! node indices are dense, assigned at build time in ascending OSM-id order,
//! and stable for the life of a cache.

use reach_core::{GeoPoint, Mode};

use crate::error::{GraphError, GraphResult};
use crate::npy::Column;

// ── RoadGraph ─────────────────────────────────────────────────────────────────

/// Directed road graph in CSR format with per-node attributes and
/// precomputed H3 columns.
///
/// Construct with [`GraphBuilder`] or load through the cache layer; never
/// assembled field-by-field.
pub struct RoadGraph {
    pub mode: Mode,

    // ── Node data ─────────────────────────────────────────────────────────
    /// Original OSM node identifier per node index.
    pub node_osm_id: Column<i64>,
    pub lats: Column<f32>,
    pub lons: Column<f32>,
    /// One `u64` H3 cell column per resolution, ascending by resolution.
    pub h3_cells: Vec<(u8, Column<u64>)>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// Cumulative out-degrees; length `node_count + 1`.
    pub indptr: Column<i64>,
    /// Destination node index per edge.
    pub indices: Column<i32>,
    /// Travel time in seconds per edge, in `[1, 65_534]`.
    pub w_sec: Column<u16>,
}

impl RoadGraph {
    pub fn node_count(&self) -> usize {
        self.node_osm_id.len()
    }

    pub fn edge_count(&self) -> usize {
        self.indices.len()
    }

    /// Iterator over `(destination, seconds)` of all outgoing edges of `u`.
    ///
    /// A contiguous memory scan — this is Dijkstra's inner loop.
    #[inline]
    pub fn out_edges(&self, u: usize) -> impl Iterator<Item = (usize, u16)> + '_ {
        let start = self.indptr[u] as usize;
        let end = self.indptr[u + 1] as usize;
        (start..end).map(|e| (self.indices[e] as usize, self.w_sec[e]))
    }

    #[inline]
    pub fn out_degree(&self, u: usize) -> usize {
        (self.indptr[u + 1] - self.indptr[u]) as usize
    }

    /// Out-degree of every node, used by connectivity-aware snapping.
    pub fn out_degrees(&self) -> Vec<u32> {
        (0..self.node_count())
            .map(|u| self.out_degree(u) as u32)
            .collect()
    }

    #[inline]
    pub fn position(&self, u: usize) -> GeoPoint {
        GeoPoint::new(self.lats[u], self.lons[u])
    }

    /// The precomputed H3 column for `res`, if it was requested at build time.
    pub fn h3_column(&self, res: u8) -> Option<&[u64]> {
        self.h3_cells
            .iter()
            .find(|(r, _)| *r == res)
            .map(|(_, col)| &**col)
    }

    /// Build the transpose graph: same edge count, reversed endpoints,
    /// identical weights.
    pub fn reverse(&self) -> ReverseCsr {
        build_reverse(&self.indptr, &self.indices, &self.w_sec)
    }
}

// ── Transpose ─────────────────────────────────────────────────────────────────

/// The transpose of a CSR graph, owned.  Seeding a multi-source search here
/// turns "nearest target from each node" into "time from each node to its
/// nearest target" on the forward graph.
pub struct ReverseCsr {
    pub indptr: Vec<i64>,
    pub indices: Vec<i32>,
    pub w_sec: Vec<u16>,
}

/// Transpose arbitrary CSR arrays (also used on the CH's shortcut graphs).
pub fn build_reverse(indptr: &[i64], indices: &[i32], w_sec: &[u16]) -> ReverseCsr {
    let n = indptr.len() - 1;
    let m = indices.len();

    let mut rev_indptr = vec![0i64; n + 1];
    for &v in indices {
        rev_indptr[v as usize + 1] += 1;
    }
    for i in 1..=n {
        rev_indptr[i] += rev_indptr[i - 1];
    }

    let mut cursor: Vec<i64> = rev_indptr[..n].to_vec();
    let mut rev_indices = vec![0i32; m];
    let mut rev_w = vec![0u16; m];
    for u in 0..n {
        for e in indptr[u] as usize..indptr[u + 1] as usize {
            let v = indices[e] as usize;
            let slot = cursor[v] as usize;
            cursor[v] += 1;
            rev_indices[slot] = u as i32;
            rev_w[slot] = w_sec[e];
        }
    }

    ReverseCsr {
        indptr: rev_indptr,
        indices: rev_indices,
        w_sec: rev_w,
    }
}

// ── GraphBuilder ──────────────────────────────────────────────────────────────

/// Construct a [`RoadGraph`] incrementally, then call [`build`](Self::build).
///
/// The builder accepts nodes and directed edges in any order.  `build()`
/// counting-sorts edges by source node into the CSR arrays; within a row,
/// insertion order is preserved so rebuilds from the same extract are
/// byte-identical.
pub struct GraphBuilder {
    mode: Mode,
    osm_ids: Vec<i64>,
    lats: Vec<f32>,
    lons: Vec<f32>,
    edges: Vec<RawEdge>,
}

struct RawEdge {
    from: u32,
    to: u32,
    w_sec: u16,
}

impl GraphBuilder {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            osm_ids: Vec::new(),
            lats: Vec::new(),
            lons: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Pre-allocate for the expected number of nodes and edges to reduce
    /// reallocations when bulk-loading from OSM.
    pub fn with_capacity(mode: Mode, nodes: usize, edges: usize) -> Self {
        Self {
            mode,
            osm_ids: Vec::with_capacity(nodes),
            lats: Vec::with_capacity(nodes),
            lons: Vec::with_capacity(nodes),
            edges: Vec::with_capacity(edges),
        }
    }

    /// Add a node and return its dense index.
    pub fn add_node(&mut self, osm_id: i64, pos: GeoPoint) -> u32 {
        let idx = self.osm_ids.len() as u32;
        self.osm_ids.push(osm_id);
        self.lats.push(pos.lat);
        self.lons.push(pos.lon);
        idx
    }

    #[inline]
    pub fn node_pos(&self, idx: u32) -> GeoPoint {
        GeoPoint::new(self.lats[idx as usize], self.lons[idx as usize])
    }

    pub fn node_count(&self) -> usize {
        self.osm_ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Add a directed edge.  Zero-second edges are forbidden (the kernel
    /// rejects them); callers clamp to at least one second.
    pub fn add_directed_edge(&mut self, from: u32, to: u32, w_sec: u16) -> GraphResult<()> {
        if w_sec == 0 {
            return Err(GraphError::Osm(format!(
                "zero-weight edge {from} -> {to}"
            )));
        }
        self.edges.push(RawEdge { from, to, w_sec });
        Ok(())
    }

    /// Convenience: both directions with identical weight (the non-oneway
    /// case).
    pub fn add_road(&mut self, a: u32, b: u32, w_sec: u16) -> GraphResult<()> {
        self.add_directed_edge(a, b, w_sec)?;
        self.add_directed_edge(b, a, w_sec)
    }

    /// Consume the builder and produce a [`RoadGraph`] (without H3 columns;
    /// the cache layer attaches those).
    pub fn build(self) -> RoadGraph {
        let n = self.osm_ids.len();
        let m = self.edges.len();

        let mut indptr = vec![0i64; n + 1];
        for e in &self.edges {
            indptr[e.from as usize + 1] += 1;
        }
        for i in 1..=n {
            indptr[i] += indptr[i - 1];
        }
        debug_assert_eq!(indptr[n] as usize, m);

        let mut cursor: Vec<i64> = indptr[..n].to_vec();
        let mut indices = vec![0i32; m];
        let mut w_sec = vec![0u16; m];
        for e in &self.edges {
            let slot = cursor[e.from as usize] as usize;
            cursor[e.from as usize] += 1;
            indices[slot] = e.to as i32;
            w_sec[slot] = e.w_sec;
        }

        RoadGraph {
            mode: self.mode,
            node_osm_id: self.osm_ids.into(),
            lats: self.lats.into(),
            lons: self.lons.into(),
            h3_cells: Vec::new(),
            indptr: indptr.into(),
            indices: indices.into(),
            w_sec: w_sec.into(),
        }
    }
}
