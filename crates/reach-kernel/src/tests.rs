//! Unit tests for reach-kernel.

mod helpers {
    use crate::Csr;

    /// Owned CSR arrays for hand-built test graphs.
    pub struct OwnedCsr {
        pub indptr: Vec<i64>,
        pub indices: Vec<i32>,
        pub weights: Vec<u16>,
    }

    impl OwnedCsr {
        /// Build from `(from, to, seconds)` triples over `n` nodes.
        pub fn from_edges(n: usize, edges: &[(u32, u32, u16)]) -> Self {
            let mut indptr = vec![0i64; n + 1];
            for &(f, _, _) in edges {
                indptr[f as usize + 1] += 1;
            }
            for i in 1..=n {
                indptr[i] += indptr[i - 1];
            }
            let mut cursor: Vec<i64> = indptr[..n].to_vec();
            let mut indices = vec![0i32; edges.len()];
            let mut weights = vec![0u16; edges.len()];
            for &(f, t, w) in edges {
                let slot = cursor[f as usize] as usize;
                cursor[f as usize] += 1;
                indices[slot] = t as i32;
                weights[slot] = w;
            }
            Self {
                indptr,
                indices,
                weights,
            }
        }

        pub fn view(&self) -> Csr<'_> {
            Csr::new(&self.indptr, &self.indices, &self.weights)
        }
    }

    /// The triangle from the acceptance scenarios:
    /// A(0)→B(1) 10 s, B→C(2) 30 s, A→C 100 s.
    pub fn triangle() -> OwnedCsr {
        OwnedCsr::from_edges(3, &[(0, 1, 10), (1, 2, 30), (0, 2, 100)])
    }

    /// Its transpose: B→A 10, C→B 30, C→A 100.
    pub fn triangle_rev() -> OwnedCsr {
        OwnedCsr::from_edges(3, &[(1, 0, 10), (2, 1, 30), (2, 0, 100)])
    }
}

mod scenarios {
    use reach_core::UNREACH_U16;

    use crate::{k_best_multi_source, SearchParams, NO_SOURCE};

    /// Seeding the target on the transpose yields node→target times:
    /// A = 40 (via B), B = 30, C = 0.
    #[test]
    fn tiny_graph_times_to_target() {
        let g = super::helpers::triangle_rev();
        let labels =
            k_best_multi_source(g.view(), &[2], None, &SearchParams::new(1, 3_600, 3_600));

        assert_eq!(labels.node(0), (&[2][..], &[40u16][..]));
        assert_eq!(labels.node(1), (&[2][..], &[30u16][..]));
        assert_eq!(labels.node(2), (&[2][..], &[0u16][..]));
    }

    /// Two sources, K=2 at node C: ascending, distinct sources, and the
    /// A-label stops at source B, so A reaches C only on the direct edge.
    #[test]
    fn two_sources_distinct_sorted() {
        let g = super::helpers::triangle();
        let labels =
            k_best_multi_source(g.view(), &[0, 1], None, &SearchParams::new(2, 3_600, 3_600));

        assert_eq!(labels.node(2), (&[1, 0][..], &[30u16, 100][..]));
    }

    /// Overflow cutoff: a node only reachable past the primary cutoff still
    /// fills an empty slot, but a full node cannot be displaced there, and
    /// nothing is relaxed past the overflow cutoff.
    #[test]
    fn overflow_fills_but_never_displaces() {
        // 0 →(70 min)→ 1 →(25 min)→ 2, plus a second source 3 →(10 min)→ 1.
        let g = super::helpers::OwnedCsr::from_edges(
            4,
            &[(0, 1, 4_200), (1, 2, 1_500), (3, 1, 600)],
        );
        let params = SearchParams::new(1, 1_800, 5_400); // 30 / 90 minutes

        let labels = k_best_multi_source(g.view(), &[0, 3], None, &params);

        // Node 1 filled K=1 by source 3 at 10 min; the 70-min label from 0
        // arrives past the primary cutoff and cannot displace it.
        assert_eq!(labels.node(1), (&[3][..], &[600u16][..]));
        // Node 2 keeps the relaxation through node 1 within overflow.
        assert_eq!(labels.node(2), (&[3][..], &[2_100u16][..]));

        // Same topology without the second source: the 70-min label now
        // fills node 1's empty slot, but 70 + 25 = 95 min exceeds the
        // overflow cutoff, so node 2 stays unreached.
        let labels = k_best_multi_source(g.view(), &[0], None, &params);
        assert_eq!(labels.node(1), (&[0][..], &[4_200u16][..]));
        assert_eq!(labels.node(2), (&[NO_SOURCE][..], &[UNREACH_U16][..]));
    }
}

mod boundaries {
    use reach_core::UNREACH_U16;

    use crate::{k_best_multi_source, SearchParams, NO_SOURCE};

    /// B2: one source is plain single-source Dijkstra.
    #[test]
    fn single_source_is_dijkstra() {
        let g = super::helpers::triangle();
        let labels =
            k_best_multi_source(g.view(), &[0], None, &SearchParams::new(1, 3_600, 3_600));

        assert_eq!(labels.node(0).1, &[0u16][..]);
        assert_eq!(labels.node(1).1, &[10u16][..]);
        // Through B beats the direct edge.
        assert_eq!(labels.node(2).1, &[40u16][..]);
    }

    /// B4: K above the number of reachable sources leaves sentinel slots.
    #[test]
    fn k_exceeding_sources_leaves_sentinels() {
        let g = super::helpers::triangle();
        let labels =
            k_best_multi_source(g.view(), &[0], None, &SearchParams::new(3, 3_600, 3_600));

        let (srcs, secs) = labels.node(2);
        assert_eq!(srcs, &[0, NO_SOURCE, NO_SOURCE]);
        assert_eq!(secs, &[40, UNREACH_U16, UNREACH_U16]);
        assert_eq!(labels.occupied(2), 1);
    }

    #[test]
    fn empty_sources_all_sentinel() {
        let g = super::helpers::triangle();
        let labels = k_best_multi_source(g.view(), &[], None, &SearchParams::new(2, 600, 600));
        for u in 0..3 {
            assert_eq!(labels.occupied(u), 0);
            assert_eq!(labels.node(u).1, &[UNREACH_U16, UNREACH_U16][..]);
        }
    }

    #[test]
    fn duplicate_sources_treated_as_one() {
        let g = super::helpers::triangle();
        let labels = k_best_multi_source(
            g.view(),
            &[0, 0, 0],
            None,
            &SearchParams::new(2, 3_600, 3_600),
        );
        // Only one label at C despite three copies of the source.
        assert_eq!(labels.occupied(2), 1);
    }

    #[test]
    #[should_panic(expected = "zero-weight edge")]
    fn zero_weight_edge_panics() {
        let g = super::helpers::OwnedCsr::from_edges(2, &[(0, 1, 0)]);
        let _ = k_best_multi_source(g.view(), &[0], None, &SearchParams::new(1, 600, 600));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_source_panics() {
        let g = super::helpers::triangle();
        let _ = k_best_multi_source(g.view(), &[9], None, &SearchParams::new(1, 600, 600));
    }
}

mod concurrency {
    use crate::{k_best_multi_source, SearchParams};

    /// A ladder graph with several sources: the partitioned run must agree
    /// with the single-pass run exactly.
    #[test]
    fn partitioned_matches_single_pass() {
        // Chain 0-1-2-...-9 with varying weights, bidirectional.
        let mut edges = Vec::new();
        let weights = [7u16, 11, 5, 13, 3, 17, 9, 2, 19];
        for (i, &w) in weights.iter().enumerate() {
            edges.push((i as u32, i as u32 + 1, w));
            edges.push((i as u32 + 1, i as u32, w));
        }
        let g = super::helpers::OwnedCsr::from_edges(10, &edges);
        let sources = [0i32, 3, 7, 9];

        let single = k_best_multi_source(
            g.view(),
            &sources,
            None,
            &SearchParams::new(3, 600, 600),
        );
        let parallel = k_best_multi_source(
            g.view(),
            &sources,
            None,
            &SearchParams::new(3, 600, 600).with_threads(2),
        );

        for u in 0..10 {
            assert_eq!(single.node(u), parallel.node(u), "node {u}");
        }
    }

    /// Early exit with targets returns the same times at the targets.
    #[test]
    fn target_early_exit_matches_full_run() {
        let g = super::helpers::triangle_rev();
        let params = SearchParams::new(1, 3_600, 3_600);

        let full = k_best_multi_source(g.view(), &[2], None, &params);
        let targeted = k_best_multi_source(g.view(), &[2], Some(&[0, 1]), &params);

        assert_eq!(full.node(0), targeted.node(0));
        assert_eq!(full.node(1), targeted.node(1));
    }
}

mod labels {
    use crate::labels::Offer;
    use crate::KBestLabels;

    #[test]
    fn per_source_replacement_keeps_minimum() {
        let mut l = KBestLabels::sentinel(1, 3);
        assert_eq!(l.offer(0, 50, 7), Offer::Accepted);
        assert_eq!(l.offer(0, 60, 7), Offer::Duplicate);
        assert_eq!(l.offer(0, 40, 7), Offer::Accepted); // replaces the 50
        let (srcs, secs) = l.node(0);
        assert_eq!(srcs[0], 7);
        assert_eq!(secs[0], 40);
        assert_eq!(l.occupied(0), 1);
    }

    #[test]
    fn worst_slot_displaced_when_full() {
        let mut l = KBestLabels::sentinel(1, 2);
        l.offer(0, 10, 1);
        l.offer(0, 20, 2);
        assert_eq!(l.offer(0, 30, 3), Offer::Rejected);
        assert_eq!(l.offer(0, 15, 3), Offer::Accepted);
        let (srcs, secs) = l.node(0);
        assert_eq!(srcs, &[1, 3]);
        assert_eq!(secs, &[10, 15]);
    }

    #[test]
    fn merge_recomputes_global_topk() {
        let mut a = KBestLabels::sentinel(2, 2);
        a.offer(0, 10, 1);
        a.offer(0, 40, 2);
        let mut b = KBestLabels::sentinel(2, 2);
        b.offer(0, 25, 3);
        b.offer(1, 5, 3);

        a.merge_from(&b);
        let (srcs, secs) = a.node(0);
        assert_eq!(srcs, &[1, 3]);
        assert_eq!(secs, &[10, 25]);
        assert_eq!(a.node(1).1[0], 5);
    }
}
