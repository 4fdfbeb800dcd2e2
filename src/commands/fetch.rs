use clap::{Arg, ArgAction, ArgMatches, Command};
use color_eyre::eyre::Result;
use faultline::{
    acquisition::{AcquisitionReport, AcquisitionRequest, AcquisitionScheduler},
    cache::{CacheStore, DiskCacheStore},
    catalog::{CatalogClient, UsgsCatalogSource},
    config::Config,
    core::types::{DateRange, Magnitude},
    error,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Register fetch command
pub fn register_command() -> Command {
    super::with_range_args(Command::new("fetch").about("Download the daily catalog units of a date range into the cache"))
        .arg(
            Arg::new("force")
                .long("force")
                .help("Re-fetch days that are already cached")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .help("Maximum number of outstanding requests (defaults to acquisition.concurrency)")
                .value_parser(clap::value_parser!(usize)),
        )
}

/// Fetch every uncached day of the range
pub async fn execute(config: &Config, args: &ArgMatches) -> Result<()> {
    let (range, magnitude) = super::parse_range_args(args, config)?;
    let force = args.get_flag("force");
    let concurrency = args.get_one::<usize>("concurrency").copied().unwrap_or(config.acquisition.concurrency);

    let report = acquire(config, range, magnitude, force, concurrency).await?;
    for unit in report.failed() {
        if let Some(failure) = &unit.failure {
            warn!("  {} failed ({:?}): {}", unit.day, failure.kind, failure.message);
        }
    }
    if !report.is_complete() {
        info!("Run the same command again to retry the missing days");
    }
    Ok(())
}

/// Run one acquisition pass with the configured catalog and cache
pub async fn acquire(
    config: &Config,
    range: DateRange,
    magnitude: Magnitude,
    force: bool,
    concurrency: usize,
) -> error::Result<AcquisitionReport> {
    let source = Arc::new(UsgsCatalogSource::new(&config.catalog)?);
    let store: Arc<dyn CacheStore> = Arc::new(DiskCacheStore::new(&config.cache.root));
    let client = Arc::new(CatalogClient::new(source, store, config.catalog.request_delay()));

    let scheduler = AcquisitionScheduler::with_cancellation(client, super::cancel_on_ctrl_c());
    let request = AcquisitionRequest::new(range, magnitude).force(force).concurrency(concurrency);
    Ok(scheduler.run(request).await)
}
