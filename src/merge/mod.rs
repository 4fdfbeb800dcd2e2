//! Merge cached daily units into one point dataset
//!
//! Every readable unit in the range is parsed, its points are tagged with the day
//! they came from and normalised to WGS 84 longitude/latitude.

pub mod crs;

use crate::acquisition::AcquisitionReport;
use crate::cache::CacheStore;
use crate::catalog::{Feature, FeatureCollection};
use crate::core::types::{DateRange, DayStatus, EventPoint, Magnitude};
use crate::metrics;
use chrono::{DateTime, NaiveDate};
use crs::{Detected, Normalizer};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("Cannot reproject unit {day} from unsupported CRS {crs}")]
    Reprojection { crs: String, day: NaiveDate },
}

/// Points from every readable unit, in day order then catalog order
#[derive(Debug, Clone)]
pub struct MergedCatalog {
    pub range: DateRange,
    pub magnitude: Magnitude,
    pub points: Vec<EventPoint>,
    pub days_read: usize,
    pub days_skipped: Vec<NaiveDate>,
    /// Features without point geometry
    pub dropped_features: usize,
}

#[derive(Debug, Clone)]
pub enum MergeOutcome {
    Merged(MergedCatalog),
    /// No unit in the range could be read
    NoData { range: DateRange, magnitude: Magnitude },
}

impl MergeOutcome {
    pub fn points(&self) -> &[EventPoint] {
        match self {
            MergeOutcome::Merged(catalog) => &catalog.points,
            MergeOutcome::NoData { .. } => &[],
        }
    }

    pub fn into_points(self) -> Vec<EventPoint> {
        match self {
            MergeOutcome::Merged(catalog) => catalog.points,
            MergeOutcome::NoData { .. } => Vec::new(),
        }
    }

    /// No unit in the range could be read
    pub fn is_empty(&self) -> bool {
        matches!(self, MergeOutcome::NoData { .. })
    }
}

pub struct CatalogMerger {
    store: Arc<dyn CacheStore>,
}

impl CatalogMerger {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Merge the cached units of `range`.
    ///
    /// With a `report`, only days it marks readable are read; without one, any day
    /// present in the cache is.
    pub async fn merge(
        &self,
        range: DateRange,
        magnitude: Magnitude,
        report: Option<&AcquisitionReport>,
    ) -> Result<MergeOutcome, MergeError> {
        let mut points = Vec::new();
        let mut days_read = 0;
        let mut days_skipped = Vec::new();
        let mut dropped_features = 0;
        let mut assumed_crs = 0;

        for day in range.days() {
            if !self.is_available(day, magnitude, report).await {
                days_skipped.push(day);
                continue;
            }

            let bytes = match self.store.read(day, magnitude).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping {}: cached unit unreadable: {}", day, e);
                    days_skipped.push(day);
                    continue;
                },
            };

            let collection = match FeatureCollection::parse(&bytes) {
                Ok(collection) => collection,
                Err(e) => {
                    warn!("Skipping {}: cached unit does not parse: {}", day, e);
                    days_skipped.push(day);
                    continue;
                },
            };

            let detected = crs::detect(collection.crs.as_ref())
                .map_err(|crs| MergeError::Reprojection { crs, day })?;
            if detected == Detected::Assumed {
                debug!("Unit {} declares no CRS, assuming EPSG:4326", day);
                assumed_crs += 1;
            }
            let normalizer = Normalizer::new(detected.reference());

            for feature in &collection.features {
                match to_event_point(feature, day, &normalizer) {
                    Some(point) => points.push(point),
                    None => dropped_features += 1,
                }
            }
            days_read += 1;
        }

        if assumed_crs > 0 {
            info!("{} units declared no CRS; assumed EPSG:4326 (WGS 84 lon/lat)", assumed_crs);
        }
        if dropped_features > 0 {
            warn!("Dropped {} features without point geometry", dropped_features);
        }

        if days_read == 0 {
            warn!("No readable units for {} at magnitude >= {}; nothing to merge", range, magnitude);
            return Ok(MergeOutcome::NoData { range, magnitude });
        }

        metrics::increment_points_merged(points.len() as u64);
        info!(
            "Merged {} events from {} of {} days ({} skipped)",
            points.len(),
            days_read,
            range.len(),
            days_skipped.len()
        );

        Ok(MergeOutcome::Merged(MergedCatalog { range, magnitude, points, days_read, days_skipped, dropped_features }))
    }

    async fn is_available(&self, day: NaiveDate, magnitude: Magnitude, report: Option<&AcquisitionReport>) -> bool {
        match report.and_then(|r| r.status_of(day)) {
            Some(status) if status.is_readable() => true,
            Some(status) => {
                let reason = if status == DayStatus::Error { "fetch failed" } else { "not fetched" };
                warn!("Skipping {}: {} ({})", day, reason, status);
                false
            },
            None => match self.store.exists(day, magnitude).await {
                Ok(true) => true,
                Ok(false) => {
                    warn!("Skipping {}: not in cache", day);
                    false
                },
                Err(e) => {
                    warn!("Skipping {}: cache check failed: {}", day, e);
                    false
                },
            },
        }
    }
}

fn to_event_point(feature: &Feature, day: NaiveDate, normalizer: &Normalizer) -> Option<EventPoint> {
    let (x, y, z) = feature.geometry.as_ref()?.as_point()?;
    let (lon, lat) = normalizer.to_lon_lat(x, y);

    let mut point = EventPoint::new(lon, lat, day);
    point.id = feature.id_text();
    point.depth_km = z;
    point.magnitude = feature.property_f64("mag");
    point.time = feature.property_f64("time").and_then(|ms| DateTime::from_timestamp_millis(ms as i64));
    point.place = feature.property_str("place").map(str::to_string);
    Some(point)
}
