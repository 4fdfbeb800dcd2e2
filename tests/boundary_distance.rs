use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use faultline::boundary::{BoundaryNetwork, load_boundaries};
use faultline::core::types::{BoundarySegment, BoundaryType, EventPoint, parse_day};
use faultline::geo::{BoundaryDistanceEngine, EnrichError, Hemisphere, resolve_zone};

fn write_subset(dir: &Path, name: &str, features: &str) {
    let body = format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features);
    std::fs::write(dir.join(name), body).unwrap();
}

fn line_feature(strnum: &str, desc: &str, coords: &str) -> String {
    format!(
        r#"{{"type":"Feature","properties":{{"strnum":"{}","geogdesc":"{}","platecode":"AF-AN"}},"geometry":{{"type":"LineString","coordinates":{}}}}}"#,
        strnum, desc, coords
    )
}

fn segment(id: &str, boundary_type: BoundaryType, line: Vec<[f64; 2]>) -> BoundarySegment {
    let plate_code = Some(format!("{}-plates", id));
    BoundarySegment { id: id.to_string(), boundary_type, name: None, plate_code, lines: vec![line] }
}

fn engine(segments: Vec<BoundarySegment>) -> BoundaryDistanceEngine {
    BoundaryDistanceEngine::new(Arc::new(BoundaryNetwork::new(segments)))
}

#[test]
fn test_equidistant_boundaries_loaded_from_disk() {
    let dir = TempDir::new().unwrap();
    write_subset(dir.path(), "trench.geojson", &line_feature("3", "North arc", "[[-0.5,1.0],[0.5,1.0]]"));
    write_subset(dir.path(), "ridge.geojson", &line_feature("7", "South rise", "[[-0.5,-1.0],[0.5,-1.0]]"));

    // No transform subset on disk; the other two still load
    let network = Arc::new(load_boundaries(dir.path()).unwrap());
    assert_eq!(network.len(), 2);
    assert_eq!(network.count_by_type(BoundaryType::Transform), 0);

    let engine = BoundaryDistanceEngine::new(network.clone());
    let nearest = engine.nearest(0.0, 0.0).unwrap();
    assert_eq!(nearest.segment_id, "ridge-7");
    assert_eq!(nearest.boundary_type, BoundaryType::Ridge);
    assert_eq!(nearest.name.as_deref(), Some("South rise"));
    assert_eq!(nearest.plate_code.as_deref(), Some("AF-AN"));

    // Each boundary on its own sits at the same distance
    let north = BoundaryDistanceEngine::new(Arc::new(BoundaryNetwork::new(vec![
        network.get("trench-3").unwrap().clone(),
    ])));
    let south = BoundaryDistanceEngine::new(Arc::new(BoundaryNetwork::new(vec![
        network.get("ridge-7").unwrap().clone(),
    ])));
    let d_north = north.nearest(0.0, 0.0).unwrap().distance_m;
    let d_south = south.nearest(0.0, 0.0).unwrap().distance_m;
    assert!((d_north - d_south).abs() < 1e-6, "{} vs {}", d_north, d_south);
    assert!((nearest.distance_m - d_south).abs() < 1e-6);
}

#[test]
fn test_enriched_point_reports_one_boundary() {
    let engine = engine(vec![
        segment("trench-3", BoundaryType::Trench, vec![[-0.5, 1.0], [0.5, 1.0]]),
        segment("ridge-7", BoundaryType::Ridge, vec![[-0.5, -1.0], [0.5, -1.0]]),
    ]);

    let day = parse_day("2024-01-01").unwrap();
    let batch = engine.enrich_all(&[EventPoint::new(0.0, 0.0, day)]);
    assert!(batch.failures.is_empty());

    let enrichment = batch.points[0].enrichment.as_ref().unwrap();
    assert_eq!(enrichment.nearest_boundary_id, "ridge-7");
    assert_eq!(enrichment.nearest_boundary_type, BoundaryType::Ridge);
    assert!(enrichment.distance_m > 0.0);

    let json = serde_json::to_value(&batch.points[0]).unwrap();
    assert_eq!(json["nearest_boundary_id"], "ridge-7");
    assert_eq!(json["nearest_boundary_type"], "ridge");
    assert_eq!(json["nearest_boundary_plate_code"], "ridge-7-plates");
}

#[test]
fn test_result_independent_of_segment_order() {
    let segments = vec![
        segment("transform-2", BoundaryType::Transform, vec![[10.0, -5.0], [12.0, 5.0]]),
        segment("trench-9", BoundaryType::Trench, vec![[-30.0, 20.0], [-25.0, 25.0], [-20.0, 22.0]]),
        segment("ridge-1", BoundaryType::Ridge, vec![[40.0, -40.0], [45.0, -30.0]]),
        segment("ridge-4", BoundaryType::Ridge, vec![[-70.0, -10.0], [-72.0, 10.0]]),
    ];
    let mut reversed = segments.clone();
    reversed.reverse();

    let forward = engine(segments);
    let backward = engine(reversed);

    for &(lon, lat) in &[(0.0, 0.0), (-27.0, 10.0), (41.0, -20.0), (-60.0, 0.0), (170.0, 60.0)] {
        let a = forward.nearest(lon, lat).unwrap();
        let b = backward.nearest(lon, lat).unwrap();
        assert_eq!(a.segment_id, b.segment_id, "at ({}, {})", lon, lat);
        assert_eq!(a.distance_m, b.distance_m);
        assert_eq!(a.zone, b.zone);
    }
}

#[test]
fn test_distances_are_finite_and_non_negative_over_grid() {
    let engine = engine(vec![
        segment("ridge-1", BoundaryType::Ridge, vec![[-30.0, -60.0], [-15.0, 0.0], [-25.0, 60.0]]),
        segment("trench-1", BoundaryType::Trench, vec![[140.0, 30.0], [145.0, 45.0], [160.0, 55.0]]),
        segment("transform-1", BoundaryType::Transform, vec![[179.0, -10.0], [-179.0, -12.0]]),
    ]);

    let mut lon = -180.0;
    while lon <= 180.0 {
        let mut lat = -80.0;
        while lat <= 80.0 {
            let first = engine.nearest(lon, lat).unwrap();
            let again = engine.nearest(lon, lat).unwrap();
            assert!(first.distance_m.is_finite() && first.distance_m >= 0.0, "({}, {})", lon, lat);
            assert_eq!(first, again);
            lat += 20.0;
        }
        lon += 30.0;
    }
}

#[test]
fn test_zone_edges_resolve_deterministically() {
    assert_eq!(resolve_zone(6.0, 10.0).unwrap().number(), 31);
    assert_eq!(resolve_zone(6.000001, 10.0).unwrap().number(), 32);
    assert_eq!(resolve_zone(-180.0, 0.0).unwrap().number(), 1);
    assert_eq!(resolve_zone(180.0, 0.0).unwrap().number(), 60);
    assert_eq!(resolve_zone(0.0, 0.0).unwrap().hemisphere(), Hemisphere::North);
    assert_eq!(resolve_zone(0.0, -0.5).unwrap().hemisphere(), Hemisphere::South);

    let engine = engine(vec![segment("ridge-1", BoundaryType::Ridge, vec![[5.0, 9.0], [7.0, 11.0]])]);
    let zones: Vec<_> = (0..5).map(|_| engine.nearest(6.0, 10.0).unwrap().zone).collect();
    assert!(zones.iter().all(|z| z.number() == 31));
}

#[test]
fn test_empty_network_and_bad_coordinates() {
    let empty = engine(Vec::new());
    assert!(matches!(empty.nearest(0.0, 0.0), Err(EnrichError::EmptyBoundaries)));

    let engine = engine(vec![segment("ridge-1", BoundaryType::Ridge, vec![[0.0, 0.0], [1.0, 1.0]])]);
    assert!(matches!(engine.nearest(f64::NAN, 0.0), Err(EnrichError::InvalidCoordinate { .. })));
    assert!(matches!(engine.nearest(0.0, 91.0), Err(EnrichError::InvalidCoordinate { .. })));
}
