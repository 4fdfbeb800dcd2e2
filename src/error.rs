//! Global error types and error handling utilities

use crate::boundary::BoundaryError;
use crate::cache::CacheError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::core::types::{InvalidMagnitude, RangeError};
use crate::export::ExportError;
use crate::geo::{EnrichError, GeoError};
use crate::merge::MergeError;

/// Any failure surfaced by the library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid date range: {0}")]
    Range(#[from] RangeError),
    #[error(transparent)]
    Magnitude(#[from] InvalidMagnitude),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),
    #[error("Boundary data error: {0}")]
    Boundary(#[from] BoundaryError),
    #[error("Geometry error: {0}")]
    Geo(#[from] GeoError),
    #[error("Enrichment error: {0}")]
    Enrich(#[from] EnrichError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Initialize error handling for the application
pub fn install_error_handlers() -> color_eyre::Result<()> {
    color_eyre::install()?;

    std::panic::set_hook(Box::new(|panic_info| {
        if let Some(location) = panic_info.location() {
            tracing::error!(
                message = %panic_info,
                panic.file = location.file(),
                panic.line = location.line(),
                panic.column = location.column(),
                "Application panic"
            );
        } else {
            tracing::error!(message = %panic_info, "Application panic");
        }

        // Test harnesses report panics themselves
        if std::env::var_os("RUST_TEST").is_some() {
            return;
        }

        eprintln!("The application panicked! This is a bug and should be reported.");

        if let Some(location) = panic_info.location() {
            eprintln!("Panic occurred at {}:{}:{}", location.file(), location.line(), location.column());
        }

        if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            eprintln!("Panic message: {}", s);
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            eprintln!("Panic message: {}", s);
        }

        eprintln!("Stack trace:");
        let backtrace = std::backtrace::Backtrace::force_capture();
        eprintln!("{}", backtrace);
    }));

    Ok(())
}
