use super::report::AcquisitionReport;
use crate::cache::CacheStore;
use crate::catalog::{CatalogClient, CatalogError, FetchedDay};
use crate::core::types::{DailyUnit, DateRange, FailureKind, Magnitude};
use crate::metrics;
use chrono::NaiveDate;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_CONCURRENCY: usize = 10;

/// One acquisition run: which days, which threshold, and how
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionRequest {
    pub range: DateRange,
    pub magnitude: Magnitude,
    /// Re-fetch days that are already cached
    pub force: bool,
    pub concurrency: usize,
}

impl AcquisitionRequest {
    pub fn new(range: DateRange, magnitude: Magnitude) -> Self {
        Self { range, magnitude, force: false, concurrency: DEFAULT_CONCURRENCY }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

enum TaskOutcome {
    Fetched(Result<FetchedDay, CatalogError>),
    Abandoned,
}

/// Drives one fetch task per uncached day through a bounded pool
pub struct AcquisitionScheduler {
    client: Arc<CatalogClient>,
    cancel: CancellationToken,
}

impl AcquisitionScheduler {
    pub fn new(client: Arc<CatalogClient>) -> Self {
        Self { client, cancel: CancellationToken::new() }
    }

    pub fn with_cancellation(client: Arc<CatalogClient>, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    pub async fn run(&self, request: AcquisitionRequest) -> AcquisitionReport {
        let started = Instant::now();
        let concurrency = request.concurrency.max(1);
        let store = self.client.store().clone();

        info!(
            "Starting acquisition for {} ({} days) at magnitude >= {} with concurrency {}{}",
            request.range,
            request.range.len(),
            request.magnitude,
            concurrency,
            if request.force { ", forcing re-fetch" } else { "" }
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut units = Vec::with_capacity(request.range.len());
        let mut pending: Vec<usize> = Vec::new();
        let mut handles: Vec<JoinHandle<TaskOutcome>> = Vec::new();

        for day in request.range.days() {
            let mut unit = DailyUnit::new(day, request.magnitude);

            if !request.force && is_cached(store.as_ref(), day, request.magnitude).await {
                if let Err(e) = unit.mark_cached() {
                    error!("{}", e);
                }
                info!("Skipping {}: already cached", day);
                metrics::increment_days_cached();
                units.push(unit);
                continue;
            }

            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();
            let magnitude = request.magnitude;

            let handle = tokio::spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    return TaskOutcome::Abandoned;
                };
                if cancel.is_cancelled() {
                    return TaskOutcome::Abandoned;
                }

                let delay = client.request_delay();
                if !delay.is_zero() {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return TaskOutcome::Abandoned,
                        _ = tokio::time::sleep(delay) => {},
                    }
                }

                let fetch_start = Instant::now();
                debug!("Fetching {}", day);
                let result = client.fetch_day(day, magnitude).await;
                metrics::time_day_fetch(fetch_start.elapsed());
                TaskOutcome::Fetched(result)
            });

            pending.push(units.len());
            handles.push(handle);
            units.push(unit);
        }

        for (index, joined) in pending.into_iter().zip(join_all(handles).await) {
            let unit = &mut units[index];
            match joined {
                Ok(TaskOutcome::Fetched(result)) => settle(unit, result),
                Ok(TaskOutcome::Abandoned) => {
                    unit.mark_abandoned();
                    warn!("Abandoned {}: acquisition cancelled before the request started", unit.day);
                },
                Err(e) => {
                    error!("Fetch task for {} failed: {:?}", unit.day, e);
                    let _ = unit.mark_fetching();
                    if let Err(e) = unit.mark_failed(FailureKind::Internal, e.to_string()) {
                        error!("{}", e);
                    }
                    metrics::increment_days_failed();
                },
            }
        }

        let report = AcquisitionReport { range: request.range, magnitude: request.magnitude, units, elapsed: started.elapsed() };
        let summary = report.summary();
        if summary.failed > 0 || summary.not_fetched > 0 {
            warn!("Acquisition finished in {:.2?} with gaps: {}", report.elapsed, summary);
        } else {
            info!("Acquisition finished in {:.2?}: {}", report.elapsed, summary);
        }
        report
    }
}

async fn is_cached(store: &dyn CacheStore, day: NaiveDate, magnitude: Magnitude) -> bool {
    match store.exists(day, magnitude).await {
        Ok(exists) => exists,
        Err(e) => {
            warn!("Could not check cache for {}, fetching instead: {}", day, e);
            false
        },
    }
}

// The unit passes through `Fetching` only while the joined result is recorded
fn settle(unit: &mut DailyUnit, result: Result<FetchedDay, CatalogError>) {
    if let Err(e) = unit.mark_fetching() {
        error!("{}", e);
        return;
    }

    let transition = match result {
        Ok(fetched) if fetched.feature_count == 0 => {
            info!("Fetched {}: no events", unit.day);
            metrics::increment_days_empty();
            unit.mark_fetched(0)
        },
        Ok(fetched) => {
            info!("Fetched {}: {} events ({} bytes)", unit.day, fetched.feature_count, fetched.bytes);
            metrics::increment_days_fetched();
            unit.mark_fetched(fetched.feature_count)
        },
        Err(e) => {
            error!("Failed to fetch {}: {}", unit.day, e);
            metrics::increment_days_failed();
            unit.mark_failed(e.kind(), e.to_string())
        },
    };

    if let Err(e) = transition {
        error!("{}", e);
    }
}
