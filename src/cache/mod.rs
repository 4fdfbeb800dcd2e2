//! Day-keyed storage of raw catalog responses

pub mod disk;

pub use disk::DiskCacheStore;

use crate::core::types::Magnitude;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache entry not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return CacheError::NotFound(path.into());
        }
        CacheError::Io { path: path.into(), source }
    }
}

/// Storage for one raw response per (day, magnitude).
///
/// Readers never observe a partially written unit. Distinct keys need no
/// coordination; concurrent writes to the same key are last-writer-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, day: NaiveDate, magnitude: Magnitude) -> Result<bool, CacheError>;

    async fn write(&self, day: NaiveDate, magnitude: Magnitude, bytes: &[u8]) -> Result<(), CacheError>;

    async fn read(&self, day: NaiveDate, magnitude: Magnitude) -> Result<Vec<u8>, CacheError>;

    /// Days present for `magnitude`, ascending
    async fn cached_days(&self, magnitude: Magnitude) -> Result<Vec<NaiveDate>, CacheError>;
}
