//! `reach-kernel` — the K-best multi-source shortest-path kernel.
//!
//! Given a CSR graph, a set of source nodes, and a cap K, computes for every
//! node its K closest sources and the seconds to each.  This is the hot path
//! of both the T_hex precompute (K≈20, all anchors as sources, forward
//! direction) and the D_anchor tables (K=1, one target set at a time, on the
//! transpose).
//!
//! The kernel is label-setting over a coarse bucket priority queue (Dial's
//! algorithm) sized to the overflow cutoff in seconds: conceptually one
//! Dijkstra per source, interleaved by pushing `(node, source)` pairs onto a
//! shared queue and maintaining a per-node top-K.  Strictly better than K
//! independent runs whenever sources outnumber K, which is always the case
//! here.
//!
//! | Module     | Contents                                     |
//! |------------|----------------------------------------------|
//! | [`csr`]    | Borrowed CSR view the kernel searches over   |
//! | [`labels`] | `KBestLabels` result arrays + top-K merge    |
//! | [`kbest`]  | The search itself                            |

pub mod csr;
pub mod kbest;
pub mod labels;

#[cfg(test)]
mod tests;

pub use csr::Csr;
pub use kbest::{k_best_multi_source, SearchParams};
pub use labels::{KBestLabels, NO_SOURCE};
