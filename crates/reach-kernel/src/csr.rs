//! Borrowed CSR view.
//!
//! The kernel does not own graph memory; callers hand it the three parallel
//! arrays (typically memory-mapped cache columns or a freshly built
//! transpose).  Array element types match the cache layout so no conversion
//! pass is ever needed.

/// A directed graph as three borrowed parallel arrays.
#[derive(Copy, Clone)]
pub struct Csr<'a> {
    /// Cumulative out-degrees, length `node_count + 1`.
    pub indptr: &'a [i64],
    /// Destination node index per edge.
    pub indices: &'a [i32],
    /// Travel time in seconds per edge; must be positive.
    pub weights: &'a [u16],
}

impl<'a> Csr<'a> {
    pub fn new(indptr: &'a [i64], indices: &'a [i32], weights: &'a [u16]) -> Self {
        debug_assert_eq!(indices.len(), weights.len());
        debug_assert_eq!(*indptr.last().unwrap_or(&0) as usize, indices.len());
        Self {
            indptr,
            indices,
            weights,
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Outgoing `(destination, seconds)` pairs of `u` as a contiguous scan.
    #[inline]
    pub fn out_edges(&self, u: usize) -> impl Iterator<Item = (usize, u16)> + 'a {
        let start = self.indptr[u] as usize;
        let end = self.indptr[u + 1] as usize;
        let indices = self.indices;
        let weights = self.weights;
        (start..end).map(move |e| (indices[e] as usize, weights[e]))
    }
}
