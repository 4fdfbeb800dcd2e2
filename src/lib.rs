//! Faultline - earthquake catalog acquisition and plate boundary distances
//!
//! Faultline keeps a day-partitioned, resumable cache of a remote earthquake catalog
//! and measures every event's distance to the nearest tectonic plate boundary in a
//! locally accurate UTM projection.

// Core application modules
pub mod acquisition;
pub mod boundary;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod geo;
pub mod merge;
pub mod metrics;
