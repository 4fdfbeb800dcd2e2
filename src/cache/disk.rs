//! File-per-day cache.
//!
//! Layout:
//! ```text
//! {root}/m{magnitude}/{YYYY-MM-DD}.geojson
//! ```

use super::{CacheError, CacheStore};
use crate::core::types::{DAY_FORMAT, Magnitude};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

const EXTENSION: &str = "geojson";

#[derive(Debug)]
pub struct DiskCacheStore {
    root: PathBuf,
    temp_counter: AtomicU64,
}

impl DiskCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), temp_counter: AtomicU64::new(0) }
    }

    pub fn namespace_dir(&self, magnitude: Magnitude) -> PathBuf {
        self.root.join(magnitude.cache_namespace())
    }

    pub fn path_for(&self, day: NaiveDate, magnitude: Magnitude) -> PathBuf {
        self.namespace_dir(magnitude).join(format!("{}.{}", day.format(DAY_FORMAT), EXTENSION))
    }

    // Unique per process and call so concurrent writers never share a temp file
    fn temp_path_for(&self, target: &Path) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let name = target.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        target.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), n))
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    async fn exists(&self, day: NaiveDate, magnitude: Magnitude) -> Result<bool, CacheError> {
        let path = self.path_for(day, magnitude);
        tokio::fs::try_exists(&path).await.map_err(|e| CacheError::io(&path, e))
    }

    async fn write(&self, day: NaiveDate, magnitude: Magnitude, bytes: &[u8]) -> Result<(), CacheError> {
        let dir = self.namespace_dir(magnitude);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| CacheError::io(&dir, e))?;

        let path = self.path_for(day, magnitude);
        let temp_path = self.temp_path_for(&path);

        if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(CacheError::io(&temp_path, e));
        }
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(CacheError::io(&path, e));
        }

        debug!("Cached {} bytes at {}", bytes.len(), path.display());
        Ok(())
    }

    async fn read(&self, day: NaiveDate, magnitude: Magnitude) -> Result<Vec<u8>, CacheError> {
        let path = self.path_for(day, magnitude);
        tokio::fs::read(&path).await.map_err(|e| CacheError::io(&path, e))
    }

    async fn cached_days(&self, magnitude: Magnitude) -> Result<Vec<NaiveDate>, CacheError> {
        let dir = self.namespace_dir(magnitude);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&dir, e)),
        };

        let mut days = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| CacheError::io(&dir, e))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).map(|s| NaiveDate::parse_from_str(s, DAY_FORMAT)) {
                Some(Ok(day)) => days.push(day),
                _ => trace!("Ignoring unrecognised cache file {}", path.display()),
            }
        }

        days.sort_unstable();
        Ok(days)
    }
}
