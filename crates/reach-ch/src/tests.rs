//! Unit tests for reach-ch.
//!
//! The kernel crate provides the reference distances: a CH query must agree
//! exactly with plain label-setting Dijkstra on the same arrays.

mod helpers {
    /// Owned CSR arrays for hand-built test graphs.
    pub struct OwnedCsr {
        pub indptr: Vec<i64>,
        pub indices: Vec<i32>,
        pub weights: Vec<u16>,
    }

    impl OwnedCsr {
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
    }

    /// A directed ring with two chords — asymmetric, strongly connected.
    pub fn ring_with_chords() -> OwnedCsr {
        let mut edges: Vec<(u32, u32, u16)> = (0..10u32)
            .map(|i| (i, (i + 1) % 10, 5 + i as u16))
            .collect();
        edges.push((0, 5, 3));
        edges.push((7, 2, 4));
        OwnedCsr::from_edges(10, &edges)
    }

    /// Reference distances from `origin` via the kernel (K=1, one source).
    pub fn dijkstra_reference(csr: &OwnedCsr, origin: i32, limit_s: u32) -> Vec<u32> {
        use reach_core::{UNREACH_U16, UNREACH_U32};
        use reach_kernel::{k_best_multi_source, Csr, SearchParams};

        let labels = k_best_multi_source(
            Csr::new(&csr.indptr, &csr.indices, &csr.weights),
            &[origin],
            None,
            &SearchParams::new(1, limit_s, limit_s),
        );
        (0..csr.indptr.len() - 1)
            .map(|u| {
                let s = labels.node(u).1[0];
                if s == UNREACH_U16 {
                    UNREACH_U32
                } else {
                    s as u32
                }
            })
            .collect()
    }
}

mod contraction {
    use reach_core::UNREACH_U32;

    use crate::contraction::build_ch;
    use crate::phast::PhastQuery;

    #[test]
    fn query_matches_dijkstra_from_every_origin() {
        let g = super::helpers::ring_with_chords();
        let ch = build_ch(&g.indptr, &g.indices, &g.weights);
        let subset: Vec<u32> = (0..10).collect();
        let mut query = PhastQuery::new(&ch);

        for origin in 0..10usize {
            let expect = super::helpers::dijkstra_reference(&g, origin as i32, 10_000);
            let got = query
                .query_subset(&ch, origin, &subset, 10_000)
                .unwrap();
            assert_eq!(got, expect, "origin {origin}");
        }
    }

    #[test]
    fn ranks_are_a_permutation() {
        let g = super::helpers::ring_with_chords();
        let ch = build_ch(&g.indptr, &g.indices, &g.weights);
        let mut ranks = ch.rank.clone();
        ranks.sort_unstable();
        assert_eq!(ranks, (0..10).collect::<Vec<u32>>());
    }

    #[test]
    fn every_edge_is_up_or_down() {
        let g = super::helpers::ring_with_chords();
        let ch = build_ch(&g.indptr, &g.indices, &g.weights);
        for u in 0..10usize {
            for e in ch.up_indptr[u] as usize..ch.up_indptr[u + 1] as usize {
                assert!(ch.rank[ch.up_indices[e] as usize] > ch.rank[u]);
            }
            for e in ch.down_indptr[u] as usize..ch.down_indptr[u + 1] as usize {
                assert!(ch.rank[ch.down_indices[e] as usize] < ch.rank[u]);
            }
        }
    }

    #[test]
    fn disconnected_target_is_unreachable() {
        // 0 → 1, plus an isolated node 2.
        let g = super::helpers::OwnedCsr::from_edges(3, &[(0, 1, 10)]);
        let ch = crate::contraction::build_ch(&g.indptr, &g.indices, &g.weights);
        let mut query = PhastQuery::new(&ch);
        let got = query.query_subset(&ch, 0, &[0, 1, 2], 1_000).unwrap();
        assert_eq!(got, vec![0, 10, UNREACH_U32]);
    }

    #[test]
    fn limit_truncates_results() {
        let g = super::helpers::OwnedCsr::from_edges(3, &[(0, 1, 100), (1, 2, 100)]);
        let ch = crate::contraction::build_ch(&g.indptr, &g.indices, &g.weights);
        let mut query = PhastQuery::new(&ch);
        let got = query.query_subset(&ch, 0, &[1, 2], 150).unwrap();
        assert_eq!(got, vec![100, UNREACH_U32]);
    }

    #[test]
    fn bad_origin_is_an_error() {
        let g = super::helpers::ring_with_chords();
        let ch = build_ch(&g.indptr, &g.indices, &g.weights);
        let mut query = PhastQuery::new(&ch);
        assert!(query.query_subset(&ch, 99, &[0], 100).is_err());
    }
}

mod reverse_semantics {
    use reach_graph::build_reverse;

    use crate::contraction::build_ch;
    use crate::phast::PhastQuery;

    /// The custom-origin identity: a reverse-graph CH queried at a node `o`
    /// returns, for each anchor node `a`, the forward-graph time a→o — and
    /// zero when the origin coincides with the anchor.
    #[test]
    fn anchor_origin_identity() {
        let g = super::helpers::ring_with_chords();
        let rev = build_reverse(&g.indptr, &g.indices, &g.weights);
        let ch = build_ch(&rev.indptr, &rev.indices, &rev.w_sec);
        let mut query = PhastQuery::new(&ch);

        let anchors: Vec<u32> = vec![0, 3, 7];
        let origin = 3usize; // coincides with anchor node 3
        let got = query.query_subset(&ch, origin, &anchors, 10_000).unwrap();

        // Zero for the coinciding anchor.
        assert_eq!(got[1], 0);
        // Forward-graph a→origin distances for the others.
        for (i, &a) in anchors.iter().enumerate() {
            let fwd = super::helpers::dijkstra_reference(&g, a as i32, 10_000);
            assert_eq!(got[i], fwd[origin], "anchor {a}");
        }
    }
}

mod persistence {
    use reach_core::Mode;

    use crate::contraction::build_ch;
    use crate::graph::{load_ch, save_ch, ChKey};
    use crate::phast::PhastQuery;

    fn key(mtime: i64) -> ChKey {
        ChKey {
            extract_mtime: mtime,
            mode: Mode::Drive,
            nodes: 10,
            edges: 12,
        }
    }

    #[test]
    fn round_trip_preserves_queries() {
        let g = super::helpers::ring_with_chords();
        let ch = build_ch(&g.indptr, &g.indices, &g.weights);
        let dir = tempfile::tempdir().unwrap();

        save_ch(dir.path(), &ch, &key(42)).unwrap();
        let loaded = load_ch(dir.path(), &key(42)).expect("cache hit");

        assert_eq!(loaded.rank, ch.rank);
        let subset: Vec<u32> = (0..10).collect();
        let mut q1 = PhastQuery::new(&ch);
        let mut q2 = PhastQuery::new(&loaded);
        assert_eq!(
            q1.query_subset(&ch, 0, &subset, 10_000).unwrap(),
            q2.query_subset(&loaded, 0, &subset, 10_000).unwrap()
        );
    }

    #[test]
    fn mismatched_key_misses() {
        let g = super::helpers::ring_with_chords();
        let ch = build_ch(&g.indptr, &g.indices, &g.weights);
        let dir = tempfile::tempdir().unwrap();
        save_ch(dir.path(), &ch, &key(42)).unwrap();

        assert!(load_ch(dir.path(), &key(43)).is_none());
        assert!(load_ch(&dir.path().join("absent"), &key(42)).is_none());
    }
}

mod prefilter {
    use reach_core::GeoPoint;

    use crate::custom::prefilter_anchors;

    #[test]
    fn radius_scales_with_minutes() {
        let origin = GeoPoint::new(42.0, -71.0);
        // ~11 km north and ~111 km north.
        let anchors = vec![
            GeoPoint::new(42.0, -71.0),
            GeoPoint::new(42.1, -71.0),
            GeoPoint::new(43.0, -71.0),
        ];

        // 10 min × 1500 m/min × 1.4 = 21 km: keeps the first two.
        assert_eq!(prefilter_anchors(&anchors, origin, 10.0), vec![0, 1]);
        // 90 min: everything within 189 km.
        assert_eq!(prefilter_anchors(&anchors, origin, 90.0), vec![0, 1, 2]);
        // Zero minutes keeps nothing.
        assert!(prefilter_anchors(&anchors, origin, 0.0).is_empty());
    }
}
