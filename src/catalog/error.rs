use crate::cache::CacheError;
use crate::core::types::FailureKind;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Catalog returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Failed to persist response: {0}")]
    LocalIo(#[from] CacheError),
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),
}

impl CatalogError {
    /// Day-level classification recorded on the unit
    pub fn kind(&self) -> FailureKind {
        match self {
            CatalogError::Timeout(_) => FailureKind::Timeout,
            CatalogError::Status { .. } => FailureKind::Status,
            CatalogError::Network(_) | CatalogError::InvalidUrl(_) => FailureKind::Network,
            CatalogError::Malformed(_) => FailureKind::Malformed,
            CatalogError::LocalIo(_) => FailureKind::LocalIo,
        }
    }
}
