//! Precomputed graph context shared across shard workers.
//!
//! Built once per run: the CSR transpose, weak-component labels, the anchor
//! projection, and the per-component anchor-node lists that the component
//! restriction reads.  Everything here is read-only after construction and
//! shared by reference into the worker pool.

use rustc_hash::FxHashMap;

use reach_anchor::AnchorProjection;
use reach_graph::{weakly_connected_components, ReverseCsr, RoadGraph};
use reach_kernel::Csr;

pub struct GraphContext {
    /// The transpose: multi-source searches seeded at target instances run
    /// here, yielding anchor→target times on the forward graph.
    pub rev: ReverseCsr,
    /// Weak-component id per node.
    pub comp_id: Vec<u32>,
    /// Anchor-carrying node indices per component.
    pub comp_anchor_nodes: FxHashMap<u32, Vec<i32>>,
    /// Anchor sites resolved to CSR node indices.
    pub projection: AnchorProjection,
}

impl GraphContext {
    pub fn build(graph: &RoadGraph, projection: AnchorProjection) -> Self {
        let rev = graph.reverse();
        let comp_id = weakly_connected_components(
            (&graph.indptr, &graph.indices),
            (&rev.indptr, &rev.indices),
        );

        let mut comp_anchor_nodes: FxHashMap<u32, Vec<i32>> = FxHashMap::default();
        for &node in &projection.anchor_nodes {
            comp_anchor_nodes
                .entry(comp_id[node as usize])
                .or_default()
                .push(node as i32);
        }

        Self {
            rev,
            comp_id,
            comp_anchor_nodes,
            projection,
        }
    }

    /// Borrowed CSR view of the transpose for the kernel.
    pub fn rev_csr(&self) -> Csr<'_> {
        Csr::new(&self.rev.indptr, &self.rev.indices, &self.rev.w_sec)
    }

    /// Candidate anchor nodes restricted to the components containing any
    /// source, ascending.  When sources span every component this is the
    /// full anchor set.
    pub fn anchors_in_source_components(&self, sources: &[i32]) -> Vec<i32> {
        let mut comps: Vec<u32> = sources
            .iter()
            .map(|&s| self.comp_id[s as usize])
            .collect();
        comps.sort_unstable();
        comps.dedup();

        let mut out: Vec<i32> = comps
            .iter()
            .filter_map(|c| self.comp_anchor_nodes.get(c))
            .flatten()
            .copied()
            .collect();
        out.sort_unstable();
        out
    }
}
