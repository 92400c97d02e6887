//! Contraction hierarchy construction.
//!
//! Nodes are contracted in priority order (edge difference plus hierarchy
//! depth, lazily re-evaluated).  Contracting `v` adds a shortcut
//! `u → t` for each in/out neighbor pair whose shortest path actually runs
//! through `v` — a bounded witness search filters the pairs where an
//! alternative path is as good, which is what keeps the shortcut count
//! near-linear on road networks.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;
use tracing::info;

use crate::graph::ChGraph;

/// Witness searches settle at most this many nodes; an undecided search
/// conservatively adds the shortcut (correctness never depends on finding
/// a witness, only query speed does).
const WITNESS_SETTLE_CAP: usize = 50;

#[derive(Clone, Copy)]
struct Edge {
    to: u32,
    weight: u32,
    /// Contracted middle node for shortcuts, `-1` for original edges.
    mid: i32,
}

/// Build a CH over CSR arrays.
///
/// The caller decides the direction: the custom-origin pipeline passes the
/// reverse CSR so one downward sweep from an origin yields origin→many
/// times on the forward graph.
pub fn build_ch(indptr: &[i64], indices: &[i32], weights: &[u16]) -> ChGraph {
    let n = indptr.len() - 1;

    // Mutable adjacency that shrinks as nodes contract.
    let mut fwd: Vec<Vec<Edge>> = vec![Vec::new(); n];
    let mut bwd: Vec<Vec<Edge>> = vec![Vec::new(); n];
    for u in 0..n {
        for e in indptr[u] as usize..indptr[u + 1] as usize {
            let v = indices[e] as usize;
            let edge = Edge {
                to: v as u32,
                weight: weights[e] as u32,
                mid: -1,
            };
            upsert(&mut fwd[u], edge);
            upsert(
                &mut bwd[v],
                Edge {
                    to: u as u32,
                    ..edge
                },
            );
        }
    }

    let mut contracted = vec![false; n];
    let mut depth = vec![0u32; n];
    let mut rank = vec![0u32; n];

    // Lazy min-heap of (priority, node); stale keys are re-checked on pop.
    let mut heap: BinaryHeap<Reverse<(i64, u32)>> = (0..n as u32)
        .map(|v| {
            Reverse((
                priority(v, &fwd, &bwd, &contracted, &depth),
                v,
            ))
        })
        .collect();

    let mut next_rank = 0u32;
    let mut shortcuts_added = 0usize;
    while let Some(Reverse((prio, v))) = heap.pop() {
        if contracted[v as usize] {
            continue;
        }
        let fresh = priority(v, &fwd, &bwd, &contracted, &depth);
        if fresh > prio {
            heap.push(Reverse((fresh, v)));
            continue;
        }

        shortcuts_added += contract_node(v, &mut fwd, &mut bwd, &contracted, &mut depth);
        contracted[v as usize] = true;
        rank[v as usize] = next_rank;
        next_rank += 1;
    }

    info!(nodes = n, shortcuts = shortcuts_added, "contracted hierarchy");
    assemble(n, &fwd, &rank)
}

/// Keep at most one parallel edge per `(from, to)`, the cheaper one.
fn upsert(adj: &mut Vec<Edge>, edge: Edge) {
    match adj.iter_mut().find(|e| e.to == edge.to) {
        Some(existing) => {
            if edge.weight < existing.weight {
                *existing = edge;
            }
        }
        None => adj.push(edge),
    }
}

/// Edge difference + hierarchy depth.  Lower contracts earlier.
fn priority(
    v: u32,
    fwd: &[Vec<Edge>],
    bwd: &[Vec<Edge>],
    contracted: &[bool],
    depth: &[u32],
) -> i64 {
    let v = v as usize;
    let ins: Vec<&Edge> = bwd[v]
        .iter()
        .filter(|e| !contracted[e.to as usize])
        .collect();
    let outs: Vec<&Edge> = fwd[v]
        .iter()
        .filter(|e| !contracted[e.to as usize])
        .collect();

    // Upper bound on shortcuts (witness searches at contraction time will
    // usually eliminate most); good enough for ordering.
    let pairs = ins
        .iter()
        .flat_map(|i| outs.iter().map(move |o| (i.to, o.to)))
        .filter(|(a, b)| a != b)
        .count() as i64;
    let removed = (ins.len() + outs.len()) as i64;

    pairs - removed + depth[v] as i64
}

/// Contract `v`: add the necessary shortcuts between its live neighbors.
/// Returns the number added.
fn contract_node(
    v: u32,
    fwd: &mut Vec<Vec<Edge>>,
    bwd: &mut Vec<Vec<Edge>>,
    contracted: &[bool],
    depth: &mut [u32],
) -> usize {
    let vu = v as usize;
    let ins: Vec<Edge> = bwd[vu]
        .iter()
        .filter(|e| !contracted[e.to as usize])
        .copied()
        .collect();
    let outs: Vec<Edge> = fwd[vu]
        .iter()
        .filter(|e| !contracted[e.to as usize])
        .copied()
        .collect();

    let mut added = 0usize;
    for i in &ins {
        // One bounded search from each in-neighbor covers all pairs.
        let max_weight = outs
            .iter()
            .filter(|o| o.to != i.to)
            .map(|o| i.weight + o.weight)
            .max();
        let Some(max_weight) = max_weight else { continue };
        let witness = witness_distances(i.to, v, max_weight, fwd, contracted);

        for o in &outs {
            if o.to == i.to {
                continue;
            }
            let through = i.weight + o.weight;
            if witness
                .get(&o.to)
                .is_some_and(|&alt| alt <= through)
            {
                continue; // a path avoiding v is as good
            }
            let shortcut = Edge {
                to: o.to,
                weight: through,
                mid: v as i32,
            };
            upsert(&mut fwd[i.to as usize], shortcut);
            upsert(
                &mut bwd[o.to as usize],
                Edge {
                    to: i.to,
                    ..shortcut
                },
            );
            added += 1;
        }

        depth[i.to as usize] = depth[i.to as usize].max(depth[vu] + 1);
    }
    for o in &outs {
        depth[o.to as usize] = depth[o.to as usize].max(depth[vu] + 1);
    }
    added
}

/// Bounded Dijkstra from `from`, skipping `skip` and contracted nodes,
/// pruned at `limit`.  Returns the settled distances.
fn witness_distances(
    from: u32,
    skip: u32,
    limit: u32,
    fwd: &[Vec<Edge>],
    contracted: &[bool],
) -> FxHashMap<u32, u32> {
    let mut dist: FxHashMap<u32, u32> = FxHashMap::default();
    let mut heap: BinaryHeap<Reverse<(u32, u32)>> = BinaryHeap::new();
    dist.insert(from, 0);
    heap.push(Reverse((0, from)));

    let mut settled = 0usize;
    while let Some(Reverse((d, u))) = heap.pop() {
        if d > *dist.get(&u).unwrap_or(&u32::MAX) {
            continue;
        }
        settled += 1;
        if settled > WITNESS_SETTLE_CAP {
            break;
        }
        for e in &fwd[u as usize] {
            if e.to == skip || contracted[e.to as usize] {
                continue;
            }
            let nd = d + e.weight;
            if nd <= limit && nd < *dist.get(&e.to).unwrap_or(&u32::MAX) {
                dist.insert(e.to, nd);
                heap.push(Reverse((nd, e.to)));
            }
        }
    }
    dist
}

/// Split the final edge set into upward/downward CSRs by rank.
fn assemble(n: usize, fwd: &[Vec<Edge>], rank: &[u32]) -> ChGraph {
    let mut up_indptr = vec![0i64; n + 1];
    let mut down_indptr = vec![0i64; n + 1];
    let mut up = Vec::new();
    let mut down = Vec::new();

    for u in 0..n {
        let mut edges: Vec<&Edge> = fwd[u].iter().collect();
        edges.sort_unstable_by_key(|e| e.to);
        for e in edges {
            if rank[e.to as usize] > rank[u] {
                up.push((u, *e));
            } else {
                down.push((u, *e));
            }
        }
    }
    for &(u, _) in &up {
        up_indptr[u + 1] += 1;
    }
    for &(u, _) in &down {
        down_indptr[u + 1] += 1;
    }
    for i in 1..=n {
        up_indptr[i] += up_indptr[i - 1];
        down_indptr[i] += down_indptr[i - 1];
    }

    let nodes_desc = ChGraph::derive_sweep_order(rank);
    ChGraph {
        rank: rank.to_vec(),
        up_indices: up.iter().map(|(_, e)| e.to as i32).collect(),
        up_weights: up.iter().map(|(_, e)| e.weight).collect(),
        up_mid: up.iter().map(|(_, e)| e.mid).collect(),
        up_indptr,
        down_indices: down.iter().map(|(_, e)| e.to as i32).collect(),
        down_weights: down.iter().map(|(_, e)| e.weight).collect(),
        down_mid: down.iter().map(|(_, e)| e.mid).collect(),
        down_indptr,
        nodes_desc,
    }
}
