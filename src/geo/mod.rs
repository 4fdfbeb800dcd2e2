//! Planar geometry for boundary distance measurement
//!
//! Zone selection, WGS 84 transverse Mercator, and the nearest-boundary engine
//! that indexes boundary edges in an R-tree.

pub mod distance;
pub mod projection;
pub mod zone;

pub use distance::{BoundaryDistanceEngine, EnrichError, EnrichmentBatch, NearestBoundary};
pub use projection::{Planar, TransverseMercator};
pub use zone::{Hemisphere, UtmZone, resolve_zone};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("Invalid coordinate: lon={lon}, lat={lat}")]
    InvalidCoordinate { lon: f64, lat: f64 },
    #[error("Invalid UTM zone: {0}")]
    InvalidZone(String),
}
