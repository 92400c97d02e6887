//! The K-best multi-source search.
//!
//! Label-setting over a bucket priority queue sized to the overflow cutoff
//! in seconds.  Each bucket holds `(node, source)` pairs; the pair's
//! distance is the bucket index, so the queue never stores it.
//!
//! Two cutoffs: labels within the primary cutoff always compete for a
//! node's K slots; past it the search keeps filling nodes that are still
//! short of K, up to the overflow cutoff, but never relaxes beyond it.
//!
//! Failure policy: malformed input (out-of-range source, zero-weight edge)
//! indicates corrupt CSR arrays and panics — these are programmer errors,
//! not recoverable conditions.

use crate::csr::Csr;
use crate::labels::{KBestLabels, Offer};

/// Knobs for one kernel invocation.
#[derive(Copy, Clone, Debug)]
pub struct SearchParams {
    /// Labels retained per node.
    pub k: usize,
    /// Primary cutoff in seconds.
    pub cutoff_primary_s: u32,
    /// Overflow cutoff in seconds; clamped up to at least the primary.
    pub cutoff_overflow_s: u32,
    /// Source partitions to run in parallel.  `1` is a single pass over all
    /// sources — fastest for one large source set.
    pub threads: usize,
}

impl SearchParams {
    pub fn new(k: usize, cutoff_primary_s: u32, cutoff_overflow_s: u32) -> Self {
        Self {
            k,
            cutoff_primary_s,
            cutoff_overflow_s,
            threads: 1,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Effective overflow cutoff: `max(primary, overflow)` capped below the
    /// `u16` sentinel range.
    fn overflow(&self) -> u32 {
        self.cutoff_overflow_s.max(self.cutoff_primary_s).min(65_533)
    }
}

/// Compute the K closest sources of every node.
///
/// `sources` are node indices into `graph`; duplicates are treated as one.
/// `targets`, when given, enables early exit once every target node holds a
/// full row (used by the K=1 D_anchor runs).  Empty sources yield
/// all-sentinel arrays.
pub fn k_best_multi_source(
    graph: Csr<'_>,
    sources: &[i32],
    targets: Option<&[i32]>,
    params: &SearchParams,
) -> KBestLabels {
    let n = graph.node_count();

    let mut sources: Vec<i32> = sources.to_vec();
    sources.sort_unstable();
    sources.dedup();
    for &s in &sources {
        assert!(
            (0..n as i32).contains(&s),
            "source node {s} out of range for graph with {n} nodes"
        );
    }

    if sources.is_empty() {
        return KBestLabels::sentinel(n, params.k);
    }

    // The foreign-source stop rule (below) must see the whole source set in
    // every pass, or partitioned runs would disagree with single-pass ones.
    let mut is_source = vec![false; n];
    for &s in &sources {
        is_source[s as usize] = true;
    }

    if params.threads <= 1 || sources.len() <= params.threads {
        return single_pass(graph, &sources, &is_source, targets, params);
    }

    // Partition sources into near-equal chunks, one independent pass each,
    // then a single-threaded K-way reduction into the true global top-K.
    let chunk = sources.len().div_ceil(params.threads);
    let partials: Vec<KBestLabels> = {
        use rayon::prelude::*;
        sources
            .par_chunks(chunk)
            .map(|part| single_pass(graph, part, &is_source, None, params))
            .collect()
    };

    let mut iter = partials.into_iter();
    let mut merged = iter.next().expect("at least one partition");
    for partial in iter {
        merged.merge_from(&partial);
    }
    merged
}

fn single_pass(
    graph: Csr<'_>,
    sources: &[i32],
    is_source: &[bool],
    targets: Option<&[i32]>,
    params: &SearchParams,
) -> KBestLabels {
    let n = graph.node_count();
    let overflow = params.overflow();
    let primary = params.cutoff_primary_s.min(overflow);
    let mut labels = KBestLabels::sentinel(n, params.k);

    // Early-exit bookkeeping for target-restricted runs.
    let mut is_target = Vec::new();
    let mut unfilled_targets = 0usize;
    if let Some(t) = targets {
        is_target = vec![false; n];
        for &idx in t {
            assert!(
                (0..n as i32).contains(&idx),
                "target node {idx} out of range for graph with {n} nodes"
            );
            if !is_target[idx as usize] {
                is_target[idx as usize] = true;
                unfilled_targets += 1;
            }
        }
    }

    let mut buckets: Vec<Vec<(u32, i32)>> = vec![Vec::new(); overflow as usize + 1];
    for &s in sources {
        buckets[0].push((s as u32, s));
    }

    'sweep: for d in 0..=overflow {
        // Weights are strictly positive, so relaxation only ever feeds
        // later buckets; popping lets the borrow end before the pushes.
        while let Some((u, s)) = buckets[d as usize].pop() {
            let u = u as usize;
            let full = labels.occupied(u) == params.k;
            if d > primary && full {
                // Past the primary cutoff labels only fill, never displace.
                continue;
            }
            match labels.offer(u, d as u16, s) {
                Offer::Duplicate | Offer::Rejected => continue,
                Offer::Accepted => {}
            }

            if unfilled_targets > 0
                && !full
                && is_target[u]
                && labels.occupied(u) == params.k
            {
                unfilled_targets -= 1;
                if unfilled_targets == 0 {
                    break 'sweep;
                }
            }

            // A label entering a foreign source stops there: any
            // continuation is dominated by that source's own zero-cost
            // label under the anchor factorization, so relaxing it would
            // only churn the queue.
            if is_source[u] && s != u as i32 {
                continue;
            }

            for (v, w) in graph.out_edges(u) {
                assert!(w > 0, "zero-weight edge {u} -> {v} in CSR");
                let nd = d + w as u32;
                if nd <= overflow {
                    buckets[nd as usize].push((v as u32, s));
                }
            }
        }
    }

    labels
}
