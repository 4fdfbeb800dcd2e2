//! Nearest plate boundary lookup
//!
//! Every query is measured in the UTM zone of the query point. Candidate edges come
//! from an R-tree over the network in geographic degrees; only those are
//! projected into the point's zone and measured exactly in the plane. When nothing
//! within the search radius is found the radius widens until the answer is provably
//! the nearest edge, or the whole network has been scanned.

use super::GeoError;
use super::projection::{K0, Planar, TransverseMercator};
use super::zone::{UtmZone, resolve_zone, validate_coordinate};
use crate::boundary::BoundaryNetwork;
use crate::core::types::{BoundarySegment, BoundaryType, Enrichment, EventPoint};
use crate::metrics;
use rayon::prelude::*;
use rstar::{AABB, RTree, RTreeObject};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Distances closer than this are treated as equal
pub const DISTANCE_TOLERANCE_M: f64 = 1e-6;

pub const DEFAULT_SEARCH_RADIUS_M: f64 = 1_000_000.0;

// Shortest length of one degree of latitude (at the equator), in meters
const MIN_METERS_PER_DEGREE: f64 = 110_574.0;

// Slack on the search window for series truncation in the projection
const WINDOW_MARGIN: f64 = 1e-3;

#[derive(Debug, Clone, thiserror::Error)]
pub enum EnrichError {
    #[error("Boundary network is empty")]
    EmptyBoundaries,
    #[error("Invalid coordinate: lon={lon}, lat={lat}")]
    InvalidCoordinate { lon: f64, lat: f64 },
    #[error("Geometry error: {0}")]
    Geo(GeoError),
}

impl From<GeoError> for EnrichError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::InvalidCoordinate { lon, lat } => EnrichError::InvalidCoordinate { lon, lat },
            other => EnrichError::Geo(other),
        }
    }
}

/// Result of a nearest-boundary query
#[derive(Debug, Clone, PartialEq)]
pub struct NearestBoundary {
    pub distance_m: f64,
    pub segment_id: String,
    pub boundary_type: BoundaryType,
    pub name: Option<String>,
    pub plate_code: Option<String>,
    pub zone: UtmZone,
}

impl NearestBoundary {
    pub fn into_enrichment(self) -> Enrichment {
        Enrichment {
            distance_m: self.distance_m,
            nearest_boundary_id: self.segment_id,
            nearest_boundary_type: self.boundary_type,
            nearest_boundary_name: self.name,
            nearest_boundary_plate_code: self.plate_code,
            utm_zone: self.zone,
        }
    }
}

/// Output of [`BoundaryDistanceEngine::enrich_all`]
#[derive(Debug, Default)]
pub struct EnrichmentBatch {
    /// Every input point in input order; failed points are returned un-enriched
    pub points: Vec<EventPoint>,
    /// Index into `points` and the reason enrichment failed
    pub failures: Vec<(usize, EnrichError)>,
}

impl EnrichmentBatch {
    pub fn enriched_count(&self) -> usize {
        self.points.len() - self.failures.len()
    }
}

/// One straight edge of a boundary polyline.
///
/// `b` is unwrapped relative to `a` so an edge crossing the antimeridian is stored
/// short (e.g. 179.5 -> 180.5) rather than spanning the globe.
#[derive(Debug, Clone, Copy)]
struct Edge {
    segment: usize,
    a: [f64; 2],
    b: [f64; 2],
}

impl RTreeObject for Edge {
    type Envelope = AABB<[f64; 2]>;

    #[inline]
    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.a, self.b)
    }
}

pub struct BoundaryDistanceEngine {
    network: Arc<BoundaryNetwork>,
    index: RTree<Edge>,
    search_radius_m: f64,
}

impl BoundaryDistanceEngine {
    pub fn new(network: Arc<BoundaryNetwork>) -> Self {
        Self::with_search_radius(network, DEFAULT_SEARCH_RADIUS_M)
    }

    pub fn with_search_radius(network: Arc<BoundaryNetwork>, search_radius_m: f64) -> Self {
        let edges = build_edges(network.segments());
        let edge_count = edges.len();
        let index = RTree::bulk_load(edges);
        let search_radius_m =
            if search_radius_m.is_finite() && search_radius_m > 0.0 { search_radius_m } else { DEFAULT_SEARCH_RADIUS_M };

        debug!(
            "Indexed {} edges from {} boundary segments (search radius {} m)",
            edge_count,
            network.len(),
            search_radius_m
        );

        Self { network, index, search_radius_m }
    }

    /// Find the boundary segment nearest to `(lon, lat)`
    pub fn nearest(&self, lon: f64, lat: f64) -> Result<NearestBoundary, EnrichError> {
        validate_coordinate(lon, lat)?;
        if self.index.size() == 0 {
            return Err(EnrichError::EmptyBoundaries);
        }

        let zone = resolve_zone(lon, lat)?;
        let tm = TransverseMercator::for_zone(zone);
        let origin = tm.forward(lon, lat);

        let mut radius = self.search_radius_m;
        loop {
            let window = SearchWindow::around(lon, lat, radius);
            let mut per_segment: BTreeMap<usize, f64> = BTreeMap::new();

            for query in &window.boxes {
                for edge in self.index.locate_in_envelope_intersecting(query) {
                    let a = tm.forward(edge.a[0], edge.a[1]);
                    let b = tm.forward(edge.b[0], edge.b[1]);
                    let d = point_segment_distance(&origin, &a, &b);
                    per_segment.entry(edge.segment).and_modify(|best| *best = best.min(d)).or_insert(d);
                }
            }

            match self.pick(&per_segment) {
                Some((segment, distance)) if distance <= radius || window.covers_all => {
                    return Ok(self.describe(segment, distance, zone));
                },
                Some((_, distance)) => {
                    // Anything nearer than the best candidate lies inside this radius
                    radius = distance * (1.0 + 1e-9) + 1.0;
                },
                None if window.covers_all => return Err(EnrichError::EmptyBoundaries),
                None => radius *= 2.0,
            }
        }
    }

    /// Attach nearest-boundary fields to a copy of `point`
    pub fn enrich(&self, point: &EventPoint) -> Result<EventPoint, EnrichError> {
        let nearest = self.nearest(point.lon, point.lat)?;
        Ok(point.with_enrichment(nearest.into_enrichment()))
    }

    /// Enrich every point in parallel, preserving input order
    pub fn enrich_all(&self, points: &[EventPoint]) -> EnrichmentBatch {
        let results: Vec<Result<EventPoint, EnrichError>> =
            points.par_iter().map(|point| self.enrich(point)).collect();

        let mut batch = EnrichmentBatch { points: Vec::with_capacity(points.len()), failures: Vec::new() };
        for (index, (result, original)) in results.into_iter().zip(points).enumerate() {
            match result {
                Ok(point) => batch.points.push(point),
                Err(err) => {
                    warn!("Could not enrich point {} at ({}, {}): {}", index, original.lon, original.lat, err);
                    batch.points.push(original.clone());
                    batch.failures.push((index, err));
                },
            }
        }

        metrics::increment_points_enriched(batch.enriched_count() as u64);
        metrics::increment_enrichment_failures(batch.failures.len() as u64);
        info!(
            "Enriched {} of {} points against {} boundary segments",
            batch.enriched_count(),
            points.len(),
            self.network.len()
        );

        batch
    }

    /// Smallest distance wins; near-ties go to the lexicographically smaller id
    fn pick(&self, per_segment: &BTreeMap<usize, f64>) -> Option<(usize, f64)> {
        let min = per_segment.values().copied().reduce(f64::min)?;
        per_segment
            .iter()
            .filter(|(_, d)| **d <= min + DISTANCE_TOLERANCE_M)
            .min_by(|(a, _), (b, _)| self.segment(**a).id.cmp(&self.segment(**b).id))
            .map(|(segment, d)| (*segment, *d))
    }

    fn segment(&self, index: usize) -> &BoundarySegment {
        &self.network.segments()[index]
    }

    fn describe(&self, segment_index: usize, distance_m: f64, zone: UtmZone) -> NearestBoundary {
        let segment = self.segment(segment_index);
        NearestBoundary {
            distance_m: distance_m.max(0.0),
            segment_id: segment.id.clone(),
            boundary_type: segment.boundary_type,
            name: segment.name.clone(),
            plate_code: segment.plate_code.clone(),
            zone,
        }
    }
}

fn build_edges(segments: &[BoundarySegment]) -> Vec<Edge> {
    let mut edges = Vec::new();
    for (segment, boundary) in segments.iter().enumerate() {
        for line in &boundary.lines {
            match line.as_slice() {
                [] => {},
                [only] => {
                    edges.push(Edge { segment, a: *only, b: *only });
                },
                vertices => {
                    for pair in vertices.windows(2) {
                        let a = pair[0];
                        let mut b = pair[1];
                        if b[0] - a[0] > 180.0 {
                            b[0] -= 360.0;
                        } else if b[0] - a[0] < -180.0 {
                            b[0] += 360.0;
                        }
                        edges.push(Edge { segment, a, b });
                    }
                },
            }
        }
    }
    edges
}

/// Geographic boxes guaranteed to contain everything within `radius` planar meters.
///
/// Transverse Mercator never shrinks a distance by more than `K0`, so the ground
/// radius covered is `radius / K0`.
struct SearchWindow {
    boxes: Vec<AABB<[f64; 2]>>,
    covers_all: bool,
}

impl SearchWindow {
    fn around(lon: f64, lat: f64, radius_m: f64) -> Self {
        let dlat = radius_m / (K0 * MIN_METERS_PER_DEGREE) * (1.0 + WINDOW_MARGIN);
        let min_lat = lat - dlat;
        let max_lat = lat + dlat;
        let reaches_pole = min_lat <= -90.0 || max_lat >= 90.0;

        let dlon = if reaches_pole {
            f64::INFINITY
        } else {
            let widest = min_lat.abs().max(max_lat.abs()).to_radians().cos();
            dlat / widest
        };

        if dlon >= 180.0 {
            // Edges are unwrapped by at most half a turn past the antimeridian
            let boxes = vec![AABB::from_corners([-360.0, min_lat], [360.0, max_lat])];
            return Self { boxes, covers_all: min_lat <= -90.0 && max_lat >= 90.0 };
        }

        let mut boxes = vec![AABB::from_corners([lon - dlon, min_lat], [lon + dlon, max_lat])];
        if lon - dlon < -180.0 {
            boxes.push(AABB::from_corners([lon - dlon + 360.0, min_lat], [lon + dlon + 360.0, max_lat]));
        }
        if lon + dlon > 180.0 {
            boxes.push(AABB::from_corners([lon - dlon - 360.0, min_lat], [lon + dlon - 360.0, max_lat]));
        }
        Self { boxes, covers_all: false }
    }
}

/// Planar distance from `p` to the closed segment `a`-`b`
fn point_segment_distance(p: &Planar, a: &Planar, b: &Planar) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    let foot = Planar { x: a.x + t * dx, y: a.y + t * dy };
    p.distance(&foot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::parse_day;

    fn segment(id: &str, boundary_type: BoundaryType, lines: Vec<Vec<[f64; 2]>>) -> BoundarySegment {
        BoundarySegment { id: id.to_string(), boundary_type, name: None, plate_code: None, lines }
    }

    fn engine(segments: Vec<BoundarySegment>) -> BoundaryDistanceEngine {
        BoundaryDistanceEngine::new(Arc::new(BoundaryNetwork::new(segments)))
    }

    #[test]
    fn test_point_segment_distance_projects_onto_interior() {
        let a = Planar { x: 0.0, y: 0.0 };
        let b = Planar { x: 10.0, y: 0.0 };
        assert_eq!(point_segment_distance(&Planar { x: 5.0, y: 3.0 }, &a, &b), 3.0);
        assert_eq!(point_segment_distance(&Planar { x: -3.0, y: 4.0 }, &a, &b), 5.0);
        assert_eq!(point_segment_distance(&Planar { x: 1.0, y: 1.0 }, &a, &a), 2f64.sqrt());
    }

    #[test]
    fn test_equidistant_segments_tie_break_by_id() {
        // Same shape mirrored across the equator
        let engine = engine(vec![
            segment("trench-b", BoundaryType::Trench, vec![vec![[-1.0, 1.0], [1.0, 1.0]]]),
            segment("ridge-a", BoundaryType::Ridge, vec![vec![[-1.0, -1.0], [1.0, -1.0]]]),
        ]);

        let nearest = engine.nearest(0.0, 0.0).unwrap();
        assert_eq!(nearest.segment_id, "ridge-a");
        assert_eq!(nearest.boundary_type, BoundaryType::Ridge);
        assert_eq!(nearest.zone.to_string(), "30N");
        assert!((nearest.distance_m - 110_687.1).abs() < 5.0, "{}", nearest.distance_m);
    }

    #[test]
    fn test_distance_zero_on_boundary() {
        // Along the central meridian of zone 32 the projected edge is exactly straight
        let engine = engine(vec![segment("ridge-1", BoundaryType::Ridge, vec![vec![[9.0, 0.0], [9.0, 5.0]]])]);
        let nearest = engine.nearest(9.0, 2.0).unwrap();
        assert!(nearest.distance_m < 1e-3);
    }

    #[test]
    fn test_search_widens_beyond_initial_radius() {
        // ~20 degrees away, well outside a 100 km radius
        let network = Arc::new(BoundaryNetwork::new(vec![segment(
            "transform-7",
            BoundaryType::Transform,
            vec![vec![[20.0, -1.0], [20.0, 1.0]]],
        )]));
        let engine = BoundaryDistanceEngine::with_search_radius(network, 100_000.0);
        let nearest = engine.nearest(0.5, 0.0).unwrap();
        assert_eq!(nearest.segment_id, "transform-7");
        assert!(nearest.distance_m > 2_000_000.0);
    }

    #[test]
    fn test_far_edge_does_not_shadow_nearer_one_outside_first_window() {
        let network = Arc::new(BoundaryNetwork::new(vec![
            segment("ridge-far", BoundaryType::Ridge, vec![vec![[30.0, -1.0], [30.0, 1.0]]]),
            segment("trench-near", BoundaryType::Trench, vec![vec![[5.0, -1.0], [5.0, 1.0]]]),
        ]));
        let engine = BoundaryDistanceEngine::with_search_radius(network, 10_000.0);
        assert_eq!(engine.nearest(0.0, 0.0).unwrap().segment_id, "trench-near");
    }

    #[test]
    fn test_window_edge_matches_exhaustive_search() {
        // Just south of the ground-radius latitude, but within 1000 km on the plane
        let segments = vec![
            segment("a-inside-window", BoundaryType::Ridge, vec![vec![[11.95, 0.0]]]),
            segment("b-just-outside", BoundaryType::Trench, vec![vec![[3.0, -9.044]]]),
        ];
        let network = Arc::new(BoundaryNetwork::new(segments));
        let windowed = BoundaryDistanceEngine::with_search_radius(network.clone(), 1_000_000.0);
        let exhaustive = BoundaryDistanceEngine::with_search_radius(network, 40_000_000.0);

        let expected = exhaustive.nearest(3.0, 0.0).unwrap();
        let found = windowed.nearest(3.0, 0.0).unwrap();
        assert_eq!(expected.segment_id, "b-just-outside");
        assert_eq!(found.segment_id, expected.segment_id);
        assert_eq!(found.distance_m, expected.distance_m);
    }

    #[test]
    fn test_single_vertex_line_is_a_point() {
        let engine = engine(vec![segment("ridge-p", BoundaryType::Ridge, vec![vec![[3.0, 1.0]]])]);
        let nearest = engine.nearest(3.0, 0.0).unwrap();
        assert!((nearest.distance_m - 110_530.0).abs() < 100.0, "{}", nearest.distance_m);
    }

    #[test]
    fn test_antimeridian_edge_found_from_both_sides() {
        let engine =
            engine(vec![segment("trench-dateline", BoundaryType::Trench, vec![vec![[179.8, -5.0], [-179.8, -5.0]]])]);
        let east = engine.nearest(179.9, -4.0).unwrap();
        let west = engine.nearest(-179.9, -4.0).unwrap();
        assert!(east.distance_m < 120_000.0, "{}", east.distance_m);
        assert!(west.distance_m < 120_000.0, "{}", west.distance_m);
    }

    #[test]
    fn test_empty_network_is_an_error() {
        let engine = engine(Vec::new());
        assert!(matches!(engine.nearest(0.0, 0.0), Err(EnrichError::EmptyBoundaries)));
    }

    #[test]
    fn test_invalid_coordinate_is_an_error() {
        let engine = engine(vec![segment("ridge-1", BoundaryType::Ridge, vec![vec![[0.0, 0.0], [1.0, 0.0]]])]);
        assert!(matches!(engine.nearest(200.0, 0.0), Err(EnrichError::InvalidCoordinate { .. })));
    }

    #[test]
    fn test_enrich_all_preserves_order_and_reports_failures() {
        let engine = engine(vec![segment("ridge-1", BoundaryType::Ridge, vec![vec![[0.0, -10.0], [0.0, 10.0]]])]);
        let day = parse_day("2024-01-01").unwrap();
        let points = vec![EventPoint::new(1.0, 0.0, day), EventPoint::new(500.0, 0.0, day), EventPoint::new(-2.0, 3.0, day)];

        let batch = engine.enrich_all(&points);
        assert_eq!(batch.points.len(), 3);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].0, 1);
        assert!(batch.points[0].enrichment.is_some());
        assert!(batch.points[1].enrichment.is_none());
        assert_eq!(batch.points[2].lon, -2.0);
        assert_eq!(batch.enriched_count(), 2);
    }
}
