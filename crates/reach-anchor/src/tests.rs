//! Unit tests for reach-anchor.

mod helpers {
    use reach_core::{GeoPoint, Mode};
    use reach_graph::{GraphBuilder, RoadGraph, SnapIndex};

    use crate::poi::PoiRecord;

    /// Three nodes on an east-west street at lat 42.0.  n1 is the
    /// well-connected middle node; n0 and n2 are leaves.
    ///
    /// Spacing is ~4 m so connectivity-preference windows are exercisable
    /// with walk-scale snap radii.
    pub fn street() -> (RoadGraph, SnapIndex) {
        let mut b = GraphBuilder::new(Mode::Walk);
        let n0 = b.add_node(500, GeoPoint::new(42.0, -71.0));
        let n1 = b.add_node(501, GeoPoint::new(42.0, -71.00005));
        let n2 = b.add_node(502, GeoPoint::new(42.0, -71.0001));
        b.add_road(n0, n1, 5).unwrap();
        b.add_road(n1, n2, 5).unwrap();
        let g = b.build();
        let snap = SnapIndex::build(&g.lats, &g.lons);
        (g, snap)
    }

    pub fn poi(id: &str, lat: f64, lon: f64, category: Option<&str>) -> PoiRecord {
        PoiRecord {
            poi_id: id.to_owned(),
            brand_id: None,
            category: category.map(str::to_owned),
            subcat: None,
            trauma_level: None,
            lon,
            lat,
        }
    }
}

mod sites {
    use reach_core::{AnchorId, Mode};

    use crate::site::build_anchor_sites;
    use crate::AnchorError;

    #[test]
    fn ids_are_contiguous_and_sorted_by_uuid() {
        let (g, snap) = super::helpers::street();
        let pois = vec![
            super::helpers::poi("p0", 42.0, -71.0, Some("grocery")),
            super::helpers::poi("p2", 42.0, -71.0001, Some("pharmacy")),
        ];
        let (sites, _) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();

        // P1: anchor ids form [0, N) with no duplicates.
        let mut ids: Vec<u32> = sites.iter().map(|s| s.anchor_int_id.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..sites.len() as u32).collect::<Vec<_>>());

        // Numbering follows the UUID string order.
        let mut by_uuid = sites.clone();
        by_uuid.sort_by(|a, b| a.site_id.cmp(&b.site_id));
        for (i, s) in by_uuid.iter().enumerate() {
            assert_eq!(s.anchor_int_id, AnchorId(i as u32));
        }
    }

    #[test]
    fn stable_ids_across_rebuilds() {
        let (g, snap) = super::helpers::street();
        let pois = vec![super::helpers::poi("p0", 42.0, -71.0, Some("grocery"))];
        let (a, _) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();
        let (b, _) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();
        assert_eq!(a[0].site_id, b[0].site_id);
        // Mode participates in the identity.
        let (c, _) = build_anchor_sites(&pois, &g, &snap, Mode::Drive).unwrap();
        assert_ne!(a[0].site_id, c[0].site_id);
    }

    #[test]
    fn copresent_pois_collapse_to_one_site() {
        let (g, snap) = super::helpers::street();
        let pois = vec![
            super::helpers::poi("p_a", 42.0, -71.00005, Some("grocery")),
            super::helpers::poi("p_b", 42.0, -71.00005, Some("pharmacy")),
        ];
        let (sites, _) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].poi_ids, vec!["p_a", "p_b"]);
        assert_eq!(sites[0].categories, vec!["grocery", "pharmacy"]);
    }

    #[test]
    fn leaf_snap_prefers_connected_neighbor() {
        let (g, snap) = super::helpers::street();
        // Nearest node is the n0 leaf (~1.6 m); the connected n1 sits
        // within twice that distance and wins.
        let pois = vec![super::helpers::poi("p", 42.0, -71.00002, Some("cafe"))];
        let (sites, report) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();
        assert_eq!(sites[0].node_osm_id, 501);
        assert_eq!(report.improved_connectivity, 1);
    }

    #[test]
    fn beyond_radius_dropped_silently() {
        let (g, snap) = super::helpers::street();
        let pois = vec![
            super::helpers::poi("near", 42.0, -71.0, Some("grocery")),
            // ~1.1 km away — far beyond the 75 m walk radius.
            super::helpers::poi("far", 42.01, -71.0, Some("grocery")),
        ];
        let (sites, report) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(report.pois_dropped_radius, 1);
        assert_eq!(report.pois_snapped, 1);
    }

    #[test]
    fn all_dropped_is_fatal() {
        let (g, snap) = super::helpers::street();
        let pois = vec![super::helpers::poi("far", 43.0, -72.0, Some("grocery"))];
        let err = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap_err();
        assert!(matches!(err, AnchorError::EmptySites));
    }

    #[test]
    fn non_anchorable_pois_ignored() {
        let (g, snap) = super::helpers::street();
        let pois = vec![
            super::helpers::poi("tagged", 42.0, -71.0, Some("grocery")),
            super::helpers::poi("bare", 42.0, -71.0, None),
        ];
        let (sites, report) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();
        assert_eq!(report.pois_anchorable, 1);
        assert_eq!(sites[0].poi_ids, vec!["tagged"]);
    }
}

mod trauma {
    use reach_core::Mode;

    use crate::poi::PoiRecord;
    use crate::site::build_anchor_sites;

    fn trauma_poi(subcat: Option<&str>, trauma_level: Option<&str>) -> PoiRecord {
        PoiRecord {
            poi_id: "h1".to_owned(),
            brand_id: None,
            category: Some("hospital".to_owned()),
            subcat: subcat.map(str::to_owned),
            trauma_level: trauma_level.map(str::to_owned),
            lon: -71.0,
            lat: 42.0,
        }
    }

    #[test]
    fn subcat_expands_to_specific_and_hospital() {
        let (g, snap) = super::helpers::street();
        let pois = vec![trauma_poi(Some("trauma_level_1_adult"), None)];
        let (sites, _) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();
        assert_eq!(sites[0].categories, vec!["hospital", "trauma_level_1_adult"]);
    }

    #[test]
    fn trauma_level_aliases_fold() {
        let (g, snap) = super::helpers::street();
        for (raw, expect) in [
            ("adult", "trauma_level_1_adult"),
            ("pediatric", "trauma_level_1_pediatric"),
            ("peds", "trauma_level_1_pediatric"),
            ("Pediatric", "trauma_level_1_pediatric"),
        ] {
            let pois = vec![trauma_poi(None, Some(raw))];
            let (sites, _) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();
            assert!(
                sites[0].categories.iter().any(|c| c == expect),
                "{raw} should expand to {expect}"
            );
            assert!(sites[0].categories.iter().any(|c| c == "hospital"));
        }
    }

    #[test]
    fn unknown_subcat_does_not_expand() {
        let (g, snap) = super::helpers::street();
        let mut poi = trauma_poi(Some("burn_unit"), None);
        poi.category = Some("clinic".to_owned());
        let (sites, _) = build_anchor_sites(&[poi], &g, &snap, Mode::Walk).unwrap();
        assert_eq!(sites[0].categories, vec!["clinic"]);
    }
}

mod io {
    use reach_core::Mode;

    use crate::io::{read_sites_parquet, write_id_map_parquet, write_sites_parquet};
    use crate::site::build_anchor_sites;

    #[test]
    fn sites_round_trip() {
        let (g, snap) = super::helpers::street();
        let pois = vec![
            super::helpers::poi("p0", 42.0, -71.0, Some("grocery")),
            super::helpers::poi("p2", 42.0, -71.0001, Some("pharmacy")),
        ];
        let (sites, _) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites.parquet");
        write_sites_parquet(&path, &sites).unwrap();
        let loaded = read_sites_parquet(&path).unwrap();

        assert_eq!(loaded.len(), sites.len());
        for (a, b) in sites.iter().zip(&loaded) {
            assert_eq!(a.site_id, b.site_id);
            assert_eq!(a.node_osm_id, b.node_osm_id);
            assert_eq!(a.poi_ids, b.poi_ids);
            assert_eq!(a.brands, b.brands);
            assert_eq!(a.categories, b.categories);
            assert_eq!(a.anchor_int_id, b.anchor_int_id);
        }

        // No stray temp file once the rename lands.
        assert!(!dir.path().join("sites.parquet.tmp").exists());
        write_id_map_parquet(&dir.path().join("map.parquet"), &sites).unwrap();
        assert!(dir.path().join("map.parquet").exists());
    }
}

mod project {
    use reach_core::Mode;

    use crate::project::AnchorProjection;
    use crate::site::build_anchor_sites;

    #[test]
    fn projection_resolves_nodes_ascending() {
        let (g, snap) = super::helpers::street();
        let pois = vec![
            super::helpers::poi("p2", 42.0, -71.0001, Some("pharmacy")),
            super::helpers::poi("p0", 42.0, -71.0, Some("grocery")),
        ];
        let (sites, _) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();
        let proj = AnchorProjection::build(&sites, &g);

        assert_eq!(proj.len(), 2);
        assert!(proj.anchor_nodes.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(proj.dropped, 0);
    }

    #[test]
    fn missing_nodes_are_dropped_not_fatal() {
        let (g, snap) = super::helpers::street();
        let pois = vec![super::helpers::poi("p0", 42.0, -71.0, Some("grocery"))];
        let (mut sites, _) = build_anchor_sites(&pois, &g, &snap, Mode::Walk).unwrap();
        sites[0].node_osm_id = 999_999; // not in the graph
        let proj = AnchorProjection::build(&sites, &g);
        assert_eq!(proj.len(), 0);
        assert_eq!(proj.dropped, 1);
    }
}
