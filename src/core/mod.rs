//! Core domain modules
pub mod types;

// Re-export common types
pub use types::{
    BoundarySegment, BoundaryType, DailyUnit, DateRange, DayFailure, DayStatus, Enrichment, EventPoint,
    FailureKind, Magnitude,
};
