//! PHAST-style one-to-many queries on a contracted graph.
//!
//! A query is a bounded upward Dijkstra from the origin followed by one
//! linear downward sweep in descending rank order.  The sweep cost is
//! `O(|down edges|)` regardless of how many targets are gathered, which is
//! what makes arbitrary-origin queries interactive.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use reach_core::UNREACH_U32;

use crate::error::{ChError, ChResult};
use crate::graph::ChGraph;

/// Reusable query scratch: distance array sized to the graph.
pub struct PhastQuery {
    dist: Vec<u32>,
    heap: BinaryHeap<Reverse<(u32, u32)>>,
}

impl PhastQuery {
    pub fn new(ch: &ChGraph) -> Self {
        Self {
            dist: vec![UNREACH_U32; ch.node_count()],
            heap: BinaryHeap::new(),
        }
    }

    /// Distances from `origin` to every node in `subset`, each clamped by
    /// `limit_s`: entries beyond the limit (or unreachable) come back as
    /// [`UNREACH_U32`].
    pub fn query_subset(
        &mut self,
        ch: &ChGraph,
        origin: usize,
        subset: &[u32],
        limit_s: u32,
    ) -> ChResult<Vec<u32>> {
        if origin >= ch.node_count() {
            return Err(ChError::BadOrigin(origin));
        }
        self.sweep(ch, origin, limit_s);
        Ok(subset
            .iter()
            .map(|&t| self.dist.get(t as usize).copied().unwrap_or(UNREACH_U32))
            .collect())
    }

    /// Upward search then full downward sweep, leaving `self.dist` holding
    /// distances to every node within `limit_s`.
    fn sweep(&mut self, ch: &ChGraph, origin: usize, limit_s: u32) {
        self.dist.fill(UNREACH_U32);
        self.heap.clear();

        // ── Upward Dijkstra ───────────────────────────────────────────────
        self.dist[origin] = 0;
        self.heap.push(Reverse((0, origin as u32)));
        while let Some(Reverse((d, u))) = self.heap.pop() {
            if d > self.dist[u as usize] {
                continue;
            }
            let u = u as usize;
            for e in ch.up_indptr[u] as usize..ch.up_indptr[u + 1] as usize {
                let v = ch.up_indices[e] as usize;
                let nd = d + ch.up_weights[e];
                if nd <= limit_s && nd < self.dist[v] {
                    self.dist[v] = nd;
                    self.heap.push(Reverse((nd, v as u32)));
                }
            }
        }

        // ── Downward sweep in descending rank ─────────────────────────────
        // When a node is visited its distance is final: every path into it
        // from the upward cloud enters through strictly higher ranks.
        for &u in &ch.nodes_desc {
            let u = u as usize;
            let du = self.dist[u];
            if du == UNREACH_U32 {
                continue;
            }
            for e in ch.down_indptr[u] as usize..ch.down_indptr[u + 1] as usize {
                let v = ch.down_indices[e] as usize;
                let nd = du + ch.down_weights[e];
                if nd <= limit_s && nd < self.dist[v] {
                    self.dist[v] = nd;
                }
            }
        }
    }
}
