//! Per-node top-K label arrays.
//!
//! Two dense `N × K` row-major arrays: the source node index of each label
//! (`NO_SOURCE` when the slot is unused) and the seconds to it
//! (`UNREACH_U16` when unused).  Rows are sorted ascending by seconds and
//! hold at most one label per source.

use reach_core::UNREACH_U16;

/// Slot-unused marker in the source array.
pub const NO_SOURCE: i32 = -1;

/// Outcome of offering a label to a node's row.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Offer {
    /// The label went into a slot; the node's neighbors should be relaxed.
    Accepted,
    /// This source already holds a slot with an equal-or-better time.
    Duplicate,
    /// The row is full and the label is not strictly better than its worst.
    Rejected,
}

/// `N × K` K-best label arrays.
pub struct KBestLabels {
    k: usize,
    /// Source node index per slot, `NO_SOURCE` when unused.
    pub source: Vec<i32>,
    /// Seconds per slot, `UNREACH_U16` when unused.
    pub seconds: Vec<u16>,
}

impl KBestLabels {
    /// All-sentinel arrays for `n` nodes.
    pub fn sentinel(n: usize, k: usize) -> Self {
        assert!(k > 0, "K must be positive");
        Self {
            k,
            source: vec![NO_SOURCE; n * k],
            seconds: vec![UNREACH_U16; n * k],
        }
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.source.len() / self.k
    }

    /// The `(sources, seconds)` row of node `u`.
    #[inline]
    pub fn node(&self, u: usize) -> (&[i32], &[u16]) {
        let row = u * self.k..(u + 1) * self.k;
        (&self.source[row.clone()], &self.seconds[row])
    }

    /// Number of occupied slots of node `u`.
    pub fn occupied(&self, u: usize) -> usize {
        self.node(u).0.iter().filter(|&&s| s != NO_SOURCE).count()
    }

    /// Best (smallest) seconds of node `u`, if any label exists.
    pub fn best_seconds(&self, u: usize) -> Option<u16> {
        let (srcs, secs) = self.node(u);
        (srcs[0] != NO_SOURCE).then_some(secs[0])
    }

    /// Offer `(d, s)` to node `u`'s row, maintaining ascending order and
    /// per-source uniqueness (an existing label from `s` is replaced only by
    /// a strictly smaller time).
    ///
    /// Within a single pass the kernel pops labels in globally
    /// non-decreasing `d`, so the replacement branch only fires during the
    /// cross-partition merge.
    pub(crate) fn offer(&mut self, u: usize, d: u16, s: i32) -> Offer {
        let row = u * self.k..(u + 1) * self.k;
        let srcs = &mut self.source[row.clone()];
        let secs = &mut self.seconds[row];

        let mut len = self.k;
        let mut dup = None;
        for i in 0..self.k {
            if srcs[i] == s {
                if d >= secs[i] {
                    return Offer::Duplicate;
                }
                dup = Some(i);
            } else if srcs[i] == NO_SOURCE {
                len = i;
                break;
            }
        }

        if let Some(i) = dup {
            // Evict the slower label from the same source, then insert.
            for j in i..len - 1 {
                srcs[j] = srcs[j + 1];
                secs[j] = secs[j + 1];
            }
            len -= 1;
            srcs[len] = NO_SOURCE;
            secs[len] = UNREACH_U16;
        } else if len == self.k {
            if d >= secs[self.k - 1] {
                return Offer::Rejected;
            }
            len -= 1; // drop the worst slot, then insert
        }

        // Insertion sort over at most K slots; K is small.
        let mut i = len;
        while i > 0 && secs[i - 1] > d {
            secs[i] = secs[i - 1];
            srcs[i] = srcs[i - 1];
            i -= 1;
        }
        secs[i] = d;
        srcs[i] = s;
        Offer::Accepted
    }

    /// Offer a label from outside the kernel (drivers assembling synthetic
    /// label sets, tests).  Returns whether the label took a slot.
    pub fn insert(&mut self, u: usize, seconds: u16, source: i32) -> bool {
        self.offer(u, seconds, source) == Offer::Accepted
    }

    /// Fold another partial result into `self`, recomputing the true top-K
    /// per node (per-source min, then ascending seconds).
    ///
    /// Used to combine the independent passes of a partitioned run; the
    /// reduction itself is single-threaded.
    pub fn merge_from(&mut self, other: &KBestLabels) {
        assert_eq!(self.k, other.k, "mismatched K");
        assert_eq!(self.source.len(), other.source.len(), "mismatched N");
        for u in 0..self.node_count() {
            let (osrcs, osecs) = other.node(u);
            for i in 0..self.k {
                if osrcs[i] == NO_SOURCE {
                    break;
                }
                // offer() keeps per-source minima and row order; equal-time
                // labels from the other pass land after existing ones,
                // which is fine — aggregation re-sorts with its own
                // tie-break downstream.
                let _ = self.offer(u, osecs[i], osrcs[i]);
            }
        }
    }
}
