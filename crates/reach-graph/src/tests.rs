//! Unit tests for reach-graph.
//!
//! All graph tests use hand-crafted networks so they run without an OSM
//! extract.

mod helpers {
    use reach_core::{GeoPoint, Mode};

    use crate::csr::RoadGraph;
    use crate::GraphBuilder;

    /// Y-shaped directed network:
    ///
    ///   0 → 1 (10 s), 1 → 2 (30 s), 0 → 2 (100 s), 2 → 3 (5 s, one-way)
    pub fn y_graph() -> RoadGraph {
        let mut b = GraphBuilder::new(Mode::Drive);
        let n0 = b.add_node(100, GeoPoint::new(42.00, -71.00));
        let n1 = b.add_node(101, GeoPoint::new(42.01, -71.00));
        let n2 = b.add_node(102, GeoPoint::new(42.02, -71.00));
        let n3 = b.add_node(103, GeoPoint::new(42.03, -71.00));
        b.add_directed_edge(n0, n1, 10).unwrap();
        b.add_directed_edge(n1, n2, 30).unwrap();
        b.add_directed_edge(n0, n2, 100).unwrap();
        b.add_directed_edge(n2, n3, 5).unwrap();
        b.build()
    }
}

// ── Speed model ───────────────────────────────────────────────────────────────

mod speed {
    use crate::speed::{default_drive_kmh, drive_mps, parse_maxspeed_kmh, segment_seconds};

    #[test]
    fn maxspeed_bare_number_is_kmh() {
        assert_eq!(parse_maxspeed_kmh("50"), Some(50.0));
        assert_eq!(parse_maxspeed_kmh("50 km/h"), Some(50.0));
    }

    #[test]
    fn maxspeed_mph_converted() {
        let v = parse_maxspeed_kmh("35 mph").unwrap();
        assert!((v - 56.33).abs() < 0.1, "got {v}");
    }

    #[test]
    fn maxspeed_list_takes_minimum() {
        assert_eq!(parse_maxspeed_kmh("30;45"), Some(30.0));
        // mph applies to the whole value, minimum first.
        let v = parse_maxspeed_kmh("20; 30 mph").unwrap();
        assert!((v - 20.0 * 1.60934).abs() < 0.01);
    }

    #[test]
    fn maxspeed_junk_rejected() {
        assert_eq!(parse_maxspeed_kmh("signals"), None);
        assert_eq!(parse_maxspeed_kmh("variable"), None);
        assert_eq!(parse_maxspeed_kmh("none"), None);
        assert_eq!(parse_maxspeed_kmh("0"), None);
    }

    #[test]
    fn highway_fallback_table() {
        assert_eq!(default_drive_kmh("motorway"), 100.0);
        assert_eq!(default_drive_kmh("motorway_link"), 100.0);
        assert_eq!(default_drive_kmh("trunk"), 80.0);
        assert_eq!(default_drive_kmh("primary"), 65.0);
        assert_eq!(default_drive_kmh("secondary"), 55.0);
        assert_eq!(default_drive_kmh("tertiary"), 45.0);
        assert_eq!(default_drive_kmh("residential"), 25.0);
        assert_eq!(default_drive_kmh("living_street"), 25.0);
        assert_eq!(default_drive_kmh("service"), 15.0);
        assert_eq!(default_drive_kmh("unclassified"), 15.0);
        assert_eq!(default_drive_kmh("busway"), 40.0);
    }

    #[test]
    fn maxspeed_overrides_highway() {
        // 36 km/h = 10 m/s.
        let mps = drive_mps(Some("36"), "motorway");
        assert!((mps - 10.0).abs() < 1e-9);
        // Unparseable maxspeed falls back to the class table.
        let mps = drive_mps(Some("signals"), "motorway");
        assert!((mps - 100.0 / 3.6).abs() < 1e-6);
    }

    #[test]
    fn segment_seconds_never_zero() {
        // A 1 m segment at motorway speed still costs one second.
        assert_eq!(segment_seconds(1.0, 27.8), 1);
        assert_eq!(segment_seconds(0.0, 27.8), 1);
    }

    #[test]
    fn segment_seconds_saturates() {
        assert_eq!(segment_seconds(1.0e9, 1.0), 65_534);
    }
}

// ── OSM tag handling ──────────────────────────────────────────────────────────

mod tags {
    use reach_core::Mode;

    use crate::osm::{access_denied, mode_admits};

    #[test]
    fn access_private_and_no_pruned() {
        assert!(access_denied(Some("private")));
        assert!(access_denied(Some("no")));
        assert!(access_denied(Some("yes;private")));
        assert!(!access_denied(Some("yes")));
        assert!(!access_denied(Some("destination")));
        assert!(!access_denied(None));
    }

    #[test]
    fn mode_profiles() {
        assert!(mode_admits(Mode::Drive, "residential"));
        assert!(!mode_admits(Mode::Drive, "footway"));
        assert!(!mode_admits(Mode::Drive, "steps"));
        assert!(mode_admits(Mode::Walk, "footway"));
        assert!(mode_admits(Mode::Walk, "residential"));
        assert!(!mode_admits(Mode::Walk, "motorway"));
    }
}

// ── CSR structure ─────────────────────────────────────────────────────────────

mod csr {
    use reach_core::{GeoPoint, Mode};

    use crate::GraphBuilder;

    #[test]
    fn out_edges_and_degrees() {
        let g = super::helpers::y_graph();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.out_degree(0), 2);
        assert_eq!(g.out_degree(3), 0);

        let from0: Vec<(usize, u16)> = g.out_edges(0).collect();
        assert_eq!(from0, vec![(1, 10), (2, 100)]);
    }

    #[test]
    fn indptr_is_cumulative() {
        let g = super::helpers::y_graph();
        assert_eq!(&*g.indptr, &[0, 2, 3, 4, 4]);
        assert_eq!(*g.indptr.last().unwrap() as usize, g.edge_count());
    }

    #[test]
    fn reverse_preserves_edges_with_swapped_endpoints() {
        let g = super::helpers::y_graph();
        let rev = g.reverse();
        assert_eq!(rev.indices.len(), g.edge_count());

        // Collect (from, to, w) sets from both directions.
        let mut fwd: Vec<(i32, i32, u16)> = Vec::new();
        for u in 0..g.node_count() {
            for (v, w) in g.out_edges(u) {
                fwd.push((u as i32, v as i32, w));
            }
        }
        let mut bwd: Vec<(i32, i32, u16)> = Vec::new();
        for v in 0..g.node_count() {
            for e in rev.indptr[v] as usize..rev.indptr[v + 1] as usize {
                bwd.push((rev.indices[e], v as i32, rev.w_sec[e]));
            }
        }
        fwd.sort_unstable();
        bwd.sort_unstable();
        assert_eq!(fwd, bwd);
    }

    #[test]
    fn zero_weight_edge_rejected() {
        let mut b = GraphBuilder::new(Mode::Walk);
        let a = b.add_node(1, GeoPoint::new(0.0, 0.0));
        let c = b.add_node(2, GeoPoint::new(0.0, 1.0));
        assert!(b.add_directed_edge(a, c, 0).is_err());
        assert!(b.add_directed_edge(a, c, 1).is_ok());
    }
}

// ── H3 columns ────────────────────────────────────────────────────────────────

mod h3 {
    use crate::h3::{compute_h3_columns, parent_cell};

    #[test]
    fn hierarchy_invariant_holds() {
        let lats = [42.3601f32, 42.65, 41.90];
        let lons = [-71.0589f32, -70.95, -71.40];
        let cols = compute_h3_columns(&lats, &lons, &[8, 7]).unwrap();
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].0, 7);
        assert_eq!(cols[1].0, 8);

        let (_, r7) = &cols[0];
        let (_, r8) = &cols[1];
        for (c7, c8) in r7.iter().zip(r8) {
            assert_eq!(parent_cell(*c8, 7).unwrap(), *c7);
        }
    }

    #[test]
    fn duplicate_resolutions_collapse() {
        let cols = compute_h3_columns(&[42.0], &[-71.0], &[8, 8]).unwrap();
        assert_eq!(cols.len(), 1);
    }

    #[test]
    fn empty_request_yields_no_columns() {
        assert!(compute_h3_columns(&[42.0], &[-71.0], &[]).unwrap().is_empty());
    }
}

// ── Components ────────────────────────────────────────────────────────────────

mod components {
    use crate::weakly_connected_components;

    #[test]
    fn two_islands() {
        // 0 → 1 and 2 → 3, no connection between pairs.
        let indptr = [0i64, 1, 1, 2, 2];
        let indices = [1i32, 3];
        let rev_indptr = [0i64, 0, 1, 1, 2];
        let rev_indices = [0i32, 2];

        let comp = weakly_connected_components((&indptr, &indices), (&rev_indptr, &rev_indices));
        assert_eq!(comp[0], comp[1]);
        assert_eq!(comp[2], comp[3]);
        assert_ne!(comp[0], comp[2]);
    }

    #[test]
    fn direction_does_not_split_components() {
        // One-way chain 0 → 1 → 2 is still a single weak component.
        let indptr = [0i64, 1, 2, 2];
        let indices = [1i32, 2];
        let rev_indptr = [0i64, 0, 1, 2];
        let rev_indices = [0i32, 1];

        let comp = weakly_connected_components((&indptr, &indices), (&rev_indptr, &rev_indices));
        assert!(comp.iter().all(|&c| c == comp[0]));
    }
}

// ── Snap index ────────────────────────────────────────────────────────────────

mod snap {
    use reach_core::GeoPoint;

    use crate::SnapIndex;

    #[test]
    fn nearest_picks_closest_node() {
        let lats = [42.00f32, 42.10, 42.20];
        let lons = [-71.00f32, -71.00, -71.00];
        let idx = SnapIndex::build(&lats, &lons);

        let (node, dist) = idx.nearest(GeoPoint::new(42.09, -71.00)).unwrap();
        assert_eq!(node, 1);
        assert!(dist < 1_500.0, "got {dist}");
    }

    #[test]
    fn k_nearest_ascending() {
        let lats = [42.00f32, 42.10, 42.20];
        let lons = [-71.00f32, -71.00, -71.00];
        let idx = SnapIndex::build(&lats, &lons);

        let hits = idx.k_nearest(GeoPoint::new(42.0, -71.0), 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].0, 0);
        assert!(hits[0].1 <= hits[1].1 && hits[1].1 <= hits[2].1);
    }

    #[test]
    fn empty_graph_returns_none() {
        let idx = SnapIndex::build(&[], &[]);
        assert!(idx.nearest(GeoPoint::new(0.0, 0.0)).is_none());
    }
}

// ── npy codec & cache naming ──────────────────────────────────────────────────

mod npy {
    use std::path::Path;

    use reach_core::Mode;

    use crate::cache::cache_dir_for;
    use crate::npy::{read_npy, write_npy, Column, MappedArray};

    #[test]
    fn round_trip_all_dtypes() {
        let dir = tempfile::tempdir().unwrap();

        let a: Vec<i64> = vec![0, -5, i64::MAX];
        write_npy(&dir.path().join("a.npy"), &a).unwrap();
        assert_eq!(read_npy::<i64>(&dir.path().join("a.npy")).unwrap(), a);

        let b: Vec<u16> = vec![0, 65_534, 65_535];
        write_npy(&dir.path().join("b.npy"), &b).unwrap();
        assert_eq!(read_npy::<u16>(&dir.path().join("b.npy")).unwrap(), b);

        let c: Vec<f32> = vec![-71.06, 42.36];
        write_npy(&dir.path().join("c.npy"), &c).unwrap();
        assert_eq!(read_npy::<f32>(&dir.path().join("c.npy")).unwrap(), c);
    }

    #[test]
    fn mmap_view_matches_written_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("col.npy");
        let vals: Vec<u64> = (0..1_000).map(|i| i * 7).collect();
        write_npy(&path, &vals).unwrap();

        let mapped = MappedArray::<u64>::open(&path).unwrap();
        assert_eq!(mapped.as_slice(), &vals[..]);

        let col = Column::<u64>::open(&path).unwrap();
        assert_eq!(&*col, &vals[..]);
    }

    #[test]
    fn dtype_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("col.npy");
        write_npy::<i32>(&path, &[1, 2, 3]).unwrap();
        assert!(read_npy::<i64>(&path).is_err());
    }

    #[test]
    fn rewrites_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("x.npy");
        let p2 = dir.path().join("y.npy");
        let vals: Vec<i32> = (0..257).collect();
        write_npy(&p1, &vals).unwrap();
        write_npy(&p2, &vals).unwrap();
        assert_eq!(std::fs::read(&p1).unwrap(), std::fs::read(&p2).unwrap());
    }

    #[test]
    fn cache_dir_keyed_by_stem_and_mode() {
        let dir = cache_dir_for(
            Path::new("data/osm/cache"),
            Path::new("data/osm/massachusetts.osm.pbf"),
            Mode::Drive,
        );
        assert_eq!(
            dir,
            Path::new("data/osm/cache/massachusetts_drive.npycache")
        );
        let dir = cache_dir_for(Path::new("c"), Path::new("x/vermont.osm.pbf"), Mode::Walk);
        assert!(dir.ends_with("vermont_walk.npycache"));
    }
}
