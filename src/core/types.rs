//! Core domain types for the application

use crate::geo::zone::UtmZone;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date format used on the command line and in cache file names
pub const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeError {
    #[error("Start date {start} is after end date {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a new range. An inverted range is rejected; `start == end` is a single day.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self, RangeError> {
        Self::new(parse_day(start)?, parse_day(end)?)
    }

    /// Number of days in the range
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Every day in the range, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Parse a `YYYY-MM-DD` calendar day
pub fn parse_day(value: &str) -> Result<NaiveDate, RangeError> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT)
        .map_err(|_| RangeError::InvalidDate(value.to_string()))
}

/// Start of the day and start of the next day, both UTC
pub fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    (start, start + Duration::days(1))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid magnitude threshold: {0}")]
pub struct InvalidMagnitude(pub String);

/// Minimum magnitude threshold of a catalog query
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Magnitude(f64);

impl Magnitude {
    pub fn new(value: f64) -> Result<Self, InvalidMagnitude> {
        if !value.is_finite() || value < 0.0 {
            return Err(InvalidMagnitude(value.to_string()));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Directory name that namespaces cached units of this threshold
    pub fn cache_namespace(&self) -> String {
        format!("m{}", self.0)
    }
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Magnitude {
    type Err = InvalidMagnitude;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<f64>().map_err(|_| InvalidMagnitude(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<f64> for Magnitude {
    type Error = InvalidMagnitude;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Magnitude> for f64 {
    fn from(m: Magnitude) -> Self {
        m.0
    }
}

/// Lifecycle state of one day's catalog unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    NotFetched,
    Cached,
    /// Transient while a finished request's outcome is recorded; never in a returned report
    Fetching,
    Success,
    Empty,
    Error,
}

impl DayStatus {
    /// Whether the unit is present in the cache and can be merged
    pub fn is_readable(&self) -> bool {
        matches!(self, DayStatus::Cached | DayStatus::Success | DayStatus::Empty)
    }

    fn can_transition_to(&self, next: DayStatus) -> bool {
        use DayStatus::*;
        matches!(
            (self, next),
            (NotFetched, Cached)
                | (NotFetched, Fetching)
                | (NotFetched, Error)
                | (Fetching, Success)
                | (Fetching, Empty)
                | (Fetching, Error)
        )
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayStatus::NotFetched => "not-fetched",
            DayStatus::Cached => "cached",
            DayStatus::Fetching => "fetching",
            DayStatus::Success => "success",
            DayStatus::Empty => "empty",
            DayStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Classification of a day-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Status,
    Network,
    Malformed,
    LocalIo,
    Abandoned,
    /// The fetch task panicked or was aborted
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayFailure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status transition for {day}: {from} -> {to}")]
pub struct StatusTransitionError {
    pub day: NaiveDate,
    pub from: DayStatus,
    pub to: DayStatus,
}

/// Outcome for exactly one (day, magnitude) unit.
///
/// The payload itself stays in the cache store; the unit records its size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUnit {
    pub day: NaiveDate,
    pub magnitude: Magnitude,
    status: DayStatus,
    pub feature_count: Option<usize>,
    pub failure: Option<DayFailure>,
}

impl DailyUnit {
    pub fn new(day: NaiveDate, magnitude: Magnitude) -> Self {
        Self { day, magnitude, status: DayStatus::NotFetched, feature_count: None, failure: None }
    }

    #[inline]
    pub fn status(&self) -> DayStatus {
        self.status
    }

    fn transition(&mut self, next: DayStatus) -> Result<(), StatusTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusTransitionError { day: self.day, from: self.status, to: next });
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_cached(&mut self) -> Result<(), StatusTransitionError> {
        self.transition(DayStatus::Cached)
    }

    pub fn mark_fetching(&mut self) -> Result<(), StatusTransitionError> {
        self.transition(DayStatus::Fetching)
    }

    /// Record a persisted response; zero features means `Empty`
    pub fn mark_fetched(&mut self, feature_count: usize) -> Result<(), StatusTransitionError> {
        let next = if feature_count == 0 { DayStatus::Empty } else { DayStatus::Success };
        self.transition(next)?;
        self.feature_count = Some(feature_count);
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Result<(), StatusTransitionError> {
        self.transition(DayStatus::Error)?;
        self.failure = Some(DayFailure { kind, message: message.into() });
        Ok(())
    }

    /// Leave the unit `NotFetched` but note why it never started
    pub fn mark_abandoned(&mut self) {
        self.failure = Some(DayFailure {
            kind: FailureKind::Abandoned,
            message: "acquisition cancelled before the request started".to_string(),
        });
    }
}

/// Category of a plate boundary segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryType {
    /// Divergent boundary (spreading ridge)
    Ridge,
    /// Transform boundary
    Transform,
    /// Convergent boundary (subduction trench)
    Trench,
}

impl BoundaryType {
    pub const ALL: [BoundaryType; 3] =
        [BoundaryType::Ridge, BoundaryType::Transform, BoundaryType::Trench];

    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryType::Ridge => "ridge",
            BoundaryType::Transform => "transform",
            BoundaryType::Trench => "trench",
        }
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ridge" | "divergent" => Ok(BoundaryType::Ridge),
            "transform" => Ok(BoundaryType::Transform),
            "trench" | "convergent" => Ok(BoundaryType::Trench),
            other => Err(format!("Unknown boundary type: {}", other)),
        }
    }
}

/// One line feature of the plate boundary network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySegment {
    pub id: String,
    pub boundary_type: BoundaryType,
    pub name: Option<String>,
    pub plate_code: Option<String>,
    /// One or more polylines of `[lon, lat]` vertices
    pub lines: Vec<Vec<[f64; 2]>>,
}

impl BoundarySegment {
    pub fn vertex_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }
}

/// Fields attached to a point by the distance engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub distance_m: f64,
    pub nearest_boundary_id: String,
    pub nearest_boundary_type: BoundaryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_boundary_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_boundary_plate_code: Option<String>,
    pub utm_zone: UtmZone,
}

/// One catalog event after merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPoint {
    pub id: Option<String>,
    pub lon: f64,
    pub lat: f64,
    pub depth_km: Option<f64>,
    pub magnitude: Option<f64>,
    pub time: Option<DateTime<Utc>>,
    pub place: Option<String>,
    pub source_day: NaiveDate,
    #[serde(flatten)]
    pub enrichment: Option<Enrichment>,
}

impl EventPoint {
    pub fn new(lon: f64, lat: f64, source_day: NaiveDate) -> Self {
        Self {
            id: None,
            lon,
            lat,
            depth_km: None,
            magnitude: None,
            time: None,
            place: None,
            source_day,
            enrichment: None,
        }
    }

    /// Copy of this point carrying the given enrichment
    pub fn with_enrichment(&self, enrichment: Enrichment) -> Self {
        Self { enrichment: Some(enrichment), ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        parse_day(s).unwrap()
    }

    #[test]
    fn test_range_rejects_inverted() {
        let err = DateRange::new(day("2024-01-05"), day("2024-01-01")).unwrap_err();
        assert!(matches!(err, RangeError::Inverted { .. }));
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::parse("2024-02-29", "2024-02-29").unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range.days().collect::<Vec<_>>(), vec![day("2024-02-29")]);
    }

    #[test]
    fn test_range_days_cross_month() {
        let range = DateRange::parse("2024-01-30", "2024-02-02").unwrap();
        let days: Vec<_> = range.days().map(|d| d.to_string()).collect();
        assert_eq!(days, vec!["2024-01-30", "2024-01-31", "2024-02-01", "2024-02-02"]);
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn test_day_window_is_one_day() {
        let (start, end) = day_window(day("2023-12-31"));
        assert_eq!(start.to_rfc3339(), "2023-12-31T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_magnitude_namespace() {
        assert_eq!(Magnitude::new(4.5).unwrap().cache_namespace(), "m4.5");
        assert_eq!(Magnitude::new(5.0).unwrap().cache_namespace(), "m5");
        assert!(Magnitude::new(-1.0).is_err());
        assert!(Magnitude::new(f64::NAN).is_err());
        assert!("abc".parse::<Magnitude>().is_err());
    }

    #[test]
    fn test_unit_lifecycle() {
        let mut unit = DailyUnit::new(day("2024-01-01"), Magnitude::new(4.5).unwrap());
        assert_eq!(unit.status(), DayStatus::NotFetched);
        unit.mark_fetching().unwrap();
        unit.mark_fetched(0).unwrap();
        assert_eq!(unit.status(), DayStatus::Empty);
        assert_eq!(unit.feature_count, Some(0));

        // Terminal states do not move again
        assert!(unit.mark_fetching().is_err());
    }

    #[test]
    fn test_cached_unit_cannot_be_fetched() {
        let mut unit = DailyUnit::new(day("2024-01-01"), Magnitude::new(2.5).unwrap());
        unit.mark_cached().unwrap();
        let err = unit.mark_fetching().unwrap_err();
        assert_eq!(err.from, DayStatus::Cached);
        assert_eq!(err.to, DayStatus::Fetching);
    }

    #[test]
    fn test_failed_unit_records_kind() {
        let mut unit = DailyUnit::new(day("2024-01-01"), Magnitude::new(2.5).unwrap());
        unit.mark_fetching().unwrap();
        unit.mark_failed(FailureKind::Timeout, "timed out").unwrap();
        assert_eq!(unit.status(), DayStatus::Error);
        assert_eq!(unit.failure.as_ref().map(|f| f.kind), Some(FailureKind::Timeout));
    }

    #[test]
    fn test_unenriched_point_serializes_without_enrichment_fields() {
        let point = EventPoint::new(10.0, 20.0, day("2024-01-01"));
        let json = serde_json::to_value(&point).unwrap();
        assert!(json.get("distance_m").is_none());
        assert!(json.get("nearest_boundary_id").is_none());
    }

    #[test]
    fn test_boundary_type_parse() {
        assert_eq!("Convergent".parse::<BoundaryType>().unwrap(), BoundaryType::Trench);
        assert!("subduction".parse::<BoundaryType>().is_err());
    }
}
