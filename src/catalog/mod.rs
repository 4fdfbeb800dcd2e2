//! Remote event catalog client and the GeoJSON model it speaks
pub mod client;
pub mod error;
pub mod geojson;

pub use client::{CatalogClient, CatalogSource, FetchedDay, UsgsCatalogSource};
pub use error::CatalogError;
pub use geojson::{Crs, Feature, FeatureCollection, Geometry};
