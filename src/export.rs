//! GeoJSON output of merged or enriched points

use crate::catalog::{Crs, Feature, FeatureCollection, Geometry};
use crate::core::types::EventPoint;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One Point feature per event; every other field becomes a property
pub fn to_feature_collection(points: &[EventPoint]) -> Result<FeatureCollection, serde_json::Error> {
    let mut features = Vec::with_capacity(points.len());
    for point in points {
        let mut properties = match serde_json::to_value(point)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        properties.remove("lon");
        properties.remove("lat");
        features.push(Feature::new(Geometry::point(point.lon, point.lat), properties));
    }

    let mut collection = FeatureCollection::new(features);
    collection.crs = Some(Crs::named("urn:ogc:def:crs:OGC:1.3:CRS84"));
    Ok(collection)
}

/// Write `points` to `path`, replacing any previous file only once fully written
pub async fn write_feature_collection(path: &Path, points: &[EventPoint]) -> Result<(), ExportError> {
    let bytes = serde_json::to_vec(&to_feature_collection(points)?)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|source| ExportError::Io { path: parent.to_path_buf(), source })?;
    }

    let file_name = path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));
    tokio::fs::write(&temp_path, &bytes).await.map_err(|source| ExportError::Io { path: temp_path.clone(), source })?;
    if let Err(source) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(ExportError::Io { path: path.to_path_buf(), source });
    }

    info!("Wrote {} features to {}", points.len(), path.display());
    Ok(())
}
