use crate::core::types::{DailyUnit, DateRange, DayStatus, Magnitude};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Per-day outcomes of one acquisition run, in day order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionReport {
    pub range: DateRange,
    pub magnitude: Magnitude,
    pub units: Vec<DailyUnit>,
    #[serde(skip)]
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionSummary {
    pub total: usize,
    pub cached: usize,
    pub success: usize,
    pub empty: usize,
    pub failed: usize,
    pub not_fetched: usize,
    pub features: usize,
}

impl fmt::Display for AcquisitionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} days: {} cached, {} fetched ({} features), {} empty, {} failed, {} not fetched",
            self.total, self.cached, self.success, self.features, self.empty, self.failed, self.not_fetched
        )
    }
}

impl AcquisitionReport {
    pub fn summary(&self) -> AcquisitionSummary {
        let mut summary = AcquisitionSummary { total: self.units.len(), ..Default::default() };
        for unit in &self.units {
            match unit.status() {
                DayStatus::Cached => summary.cached += 1,
                DayStatus::Success => summary.success += 1,
                DayStatus::Empty => summary.empty += 1,
                DayStatus::Error => summary.failed += 1,
                DayStatus::NotFetched | DayStatus::Fetching => summary.not_fetched += 1,
            }
            summary.features += unit.feature_count.unwrap_or(0);
        }
        summary
    }

    pub fn unit(&self, day: NaiveDate) -> Option<&DailyUnit> {
        self.units.iter().find(|u| u.day == day)
    }

    pub fn status_of(&self, day: NaiveDate) -> Option<DayStatus> {
        self.unit(day).map(DailyUnit::status)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DailyUnit> {
        self.units.iter().filter(|u| u.status() == DayStatus::Error)
    }

    /// Every day in the range is readable
    pub fn is_complete(&self) -> bool {
        self.units.iter().all(|u| u.status().is_readable())
    }
}
