//! Plate boundary reference network
//!
//! The reference dataset is three GeoJSON files, one per boundary category. They
//! are loaded once, tagged with their category and shared read-only.

mod loader;

pub use loader::{BoundaryError, load_boundaries, load_subset, subset_path};

use crate::core::types::{BoundarySegment, BoundaryType};

/// Immutable set of boundary segments
#[derive(Debug, Clone, Default)]
pub struct BoundaryNetwork {
    segments: Vec<BoundarySegment>,
}

impl BoundaryNetwork {
    pub fn new(segments: Vec<BoundarySegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[BoundarySegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&BoundarySegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn count_by_type(&self, boundary_type: BoundaryType) -> usize {
        self.segments.iter().filter(|s| s.boundary_type == boundary_type).count()
    }

    pub fn vertex_count(&self) -> usize {
        self.segments.iter().map(BoundarySegment::vertex_count).sum()
    }
}
