//! Concurrent, resumable day-by-day catalog acquisition
//!
//! Each day of the requested range is either skipped because the cache already
//! holds it, or fetched by its own task. Tasks share a semaphore so at most
//! `concurrency` requests are outstanding; one day's failure never affects another.

mod report;
mod scheduler;

pub use report::{AcquisitionReport, AcquisitionSummary};
pub use scheduler::{AcquisitionRequest, AcquisitionScheduler, DEFAULT_CONCURRENCY};
