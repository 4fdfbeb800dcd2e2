use super::BoundaryNetwork;
use crate::catalog::FeatureCollection;
use crate::catalog::geojson::ParseError;
use crate::core::types::{BoundarySegment, BoundaryType};
use crate::merge::crs::{self, Detected, Normalizer};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("Unsupported CRS '{crs}' in {path}")]
    UnsupportedCrs { path: PathBuf, crs: String },
    #[error("No plate boundary subset could be loaded from {0}")]
    NoBoundaries(PathBuf),
}

pub fn subset_path(dir: &Path, boundary_type: BoundaryType) -> PathBuf {
    dir.join(format!("{}.geojson", boundary_type.as_str()))
}

/// Load one category file into segments tagged with that category.
///
/// Segment ids are `<type>-<strnum>`, or `<type>-<index>` zero-padded to five
/// digits when a feature has no `strnum`. Features with no usable line are skipped.
/// Vertices in a declared UTM CRS are reprojected to WGS 84 lon/lat.
pub fn load_subset(path: &Path, boundary_type: BoundaryType) -> Result<Vec<BoundarySegment>, BoundaryError> {
    let bytes = std::fs::read(path).map_err(|source| BoundaryError::Io { path: path.to_path_buf(), source })?;
    let collection =
        FeatureCollection::parse(&bytes).map_err(|source| BoundaryError::Parse { path: path.to_path_buf(), source })?;

    let detected = crs::detect(collection.crs.as_ref())
        .map_err(|crs| BoundaryError::UnsupportedCrs { path: path.to_path_buf(), crs })?;
    if detected == Detected::Assumed {
        debug!("{} declares no CRS, assuming EPSG:4326", path.display());
    }
    let normalizer = Normalizer::new(detected.reference());

    let mut segments = Vec::with_capacity(collection.len());
    let mut skipped = 0;

    for (index, feature) in collection.features.iter().enumerate() {
        let lines: Vec<Vec<[f64; 2]>> = feature
            .geometry
            .as_ref()
            .and_then(|g| g.as_lines())
            .unwrap_or_default()
            .into_iter()
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.into_iter()
                    .map(|[x, y]| {
                        let (lon, lat) = normalizer.to_lon_lat(x, y);
                        [lon, lat]
                    })
                    .collect()
            })
            .collect();

        if lines.is_empty() {
            skipped += 1;
            continue;
        }

        let id = match feature.property_text("strnum") {
            Some(strnum) => format!("{}-{}", boundary_type.as_str(), strnum),
            None => format!("{}-{:05}", boundary_type.as_str(), index),
        };

        segments.push(BoundarySegment {
            id,
            boundary_type,
            name: feature.property_text("geogdesc"),
            plate_code: feature.property_text("platecode"),
            lines,
        });
    }

    if skipped > 0 {
        warn!("Skipped {} features without line geometry in {}", skipped, path.display());
    }
    info!("Loaded {} {} segments from {}", segments.len(), boundary_type, path.display());
    Ok(segments)
}

/// Load and concatenate the ridge, transform and trench subsets of `dir`.
///
/// A subset that is missing or fails to load is skipped with a warning; if none
/// loads the whole call fails.
pub fn load_boundaries(dir: &Path) -> Result<BoundaryNetwork, BoundaryError> {
    let mut segments = Vec::new();
    let mut loaded = 0;

    for boundary_type in BoundaryType::ALL {
        let path = subset_path(dir, boundary_type);
        if !path.exists() {
            warn!("Plate boundary subset {} not found at {}", boundary_type, path.display());
            continue;
        }
        match load_subset(&path, boundary_type) {
            Ok(subset) => {
                segments.extend(subset);
                loaded += 1;
            },
            Err(e) => warn!("Skipping {} boundaries: {}", boundary_type, e),
        }
    }

    if loaded == 0 {
        return Err(BoundaryError::NoBoundaries(dir.to_path_buf()));
    }

    let network = BoundaryNetwork::new(segments);
    info!(
        "Loaded {} boundary segments ({} ridge, {} transform, {} trench, {} vertices)",
        network.len(),
        network.count_by_type(BoundaryType::Ridge),
        network.count_by_type(BoundaryType::Transform),
        network.count_by_type(BoundaryType::Trench),
        network.vertex_count()
    );
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RIDGE: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"strnum":101,"platecode":"NA-EU","geogdesc":"Mid-Atlantic Ridge"},
         "geometry":{"type":"LineString","coordinates":[[-30.0,50.0],[-29.0,52.0]]}},
        {"type":"Feature","properties":{"platecode":"AF-SA"},
         "geometry":{"type":"MultiLineString","coordinates":[[[-14.0,-10.0],[-13.5,-12.0]],[]]}},
        {"type":"Feature","properties":{},"geometry":null}
    ]}"#;

    #[test]
    fn test_load_subset_ids_and_attributes() {
        let dir = TempDir::new().unwrap();
        let path = subset_path(dir.path(), BoundaryType::Ridge);
        std::fs::write(&path, RIDGE).unwrap();

        let segments = load_subset(&path, BoundaryType::Ridge).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].id, "ridge-101");
        assert_eq!(segments[0].name.as_deref(), Some("Mid-Atlantic Ridge"));
        assert_eq!(segments[0].plate_code.as_deref(), Some("NA-EU"));
        assert_eq!(segments[1].id, "ridge-00001");
        assert_eq!(segments[1].lines.len(), 1);
        assert!(segments.iter().all(|s| s.boundary_type == BoundaryType::Ridge));
    }

    #[test]
    fn test_utm_subset_is_reprojected() {
        // Zone 31N central meridian, 1000 km and 2000 km north of the equator
        let utm = r#"{"type":"FeatureCollection",
            "crs":{"type":"name","properties":{"name":"urn:ogc:def:crs:EPSG::32631"}},
            "features":[{"type":"Feature","properties":{"strnum":"4"},
             "geometry":{"type":"LineString","coordinates":[[500000.0,1000000.0],[500000.0,2000000.0]]}}]}"#;
        let dir = TempDir::new().unwrap();
        let path = subset_path(dir.path(), BoundaryType::Transform);
        std::fs::write(&path, utm).unwrap();

        let segments = load_subset(&path, BoundaryType::Transform).unwrap();
        let line = &segments[0].lines[0];
        assert!((line[0][0] - 3.0).abs() < 1e-9, "{:?}", line);
        assert!((line[0][1] - 9.05).abs() < 0.05, "{:?}", line);
        assert!((line[1][0] - 3.0).abs() < 1e-9, "{:?}", line);
        assert!((line[1][1] - 18.09).abs() < 0.05, "{:?}", line);
    }

    #[test]
    fn test_unsupported_crs_is_an_error() {
        let mercator = r#"{"type":"FeatureCollection",
            "crs":{"type":"name","properties":{"name":"EPSG:3857"}},
            "features":[{"type":"Feature","properties":{},
             "geometry":{"type":"LineString","coordinates":[[0.0,0.0],[1000.0,1000.0]]}}]}"#;
        let dir = TempDir::new().unwrap();
        let path = subset_path(dir.path(), BoundaryType::Ridge);
        std::fs::write(&path, mercator).unwrap();

        let err = load_subset(&path, BoundaryType::Ridge).unwrap_err();
        assert!(matches!(err, BoundaryError::UnsupportedCrs { ref crs, .. } if crs == "EPSG:3857"));
    }

    #[test]
    fn test_missing_subsets_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(subset_path(dir.path(), BoundaryType::Ridge), RIDGE).unwrap();
        std::fs::write(subset_path(dir.path(), BoundaryType::Trench), "not geojson").unwrap();

        let network = load_boundaries(dir.path()).unwrap();
        assert_eq!(network.len(), 2);
        assert_eq!(network.count_by_type(BoundaryType::Trench), 0);
        assert!(network.get("ridge-101").is_some());
    }

    #[test]
    fn test_no_subsets_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(load_boundaries(dir.path()), Err(BoundaryError::NoBoundaries(_))));
    }
}
