use clap::{Arg, ArgAction, ArgMatches, Command};
use color_eyre::eyre::{Result, eyre};
use faultline::{
    boundary,
    cache::DiskCacheStore,
    config::Config,
    export,
    geo::BoundaryDistanceEngine,
    merge::CatalogMerger,
    metrics,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Register enrich command
pub fn register_command() -> Command {
    super::with_range_args(
        Command::new("enrich").about("Merge cached units and attach the nearest plate boundary to every event"),
    )
    .arg(
        Arg::new("boundaries")
            .long("boundaries")
            .help("Directory with ridge/transform/trench GeoJSON files (defaults to boundaries.dir)")
            .value_parser(clap::value_parser!(PathBuf)),
    )
    .arg(
        Arg::new("output")
            .long("output")
            .short('o')
            .help("Destination GeoJSON file")
            .required(true)
            .value_parser(clap::value_parser!(PathBuf)),
    )
    .arg(
        Arg::new("fetch")
            .long("fetch")
            .help("Fetch missing days before merging")
            .action(ArgAction::SetTrue),
    )
}

pub async fn execute(config: &Config, args: &ArgMatches) -> Result<()> {
    let (range, magnitude) = super::parse_range_args(args, config)?;
    let output = args.get_one::<PathBuf>("output").ok_or_else(|| eyre!("--output is required"))?;
    let boundaries_dir = args.get_one::<PathBuf>("boundaries").cloned().unwrap_or_else(|| config.boundaries.dir.clone());

    let report = if args.get_flag("fetch") {
        Some(super::fetch::acquire(config, range, magnitude, false, config.acquisition.concurrency).await?)
    } else {
        None
    };

    let merger = CatalogMerger::new(Arc::new(DiskCacheStore::new(&config.cache.root)));
    let outcome = merger.merge(range, magnitude, report.as_ref()).await?;
    if outcome.is_empty() {
        warn!("Nothing cached for {}; {} not written", range, output.display());
        return Ok(());
    }
    let points = outcome.into_points();

    let network = Arc::new(boundary::load_boundaries(&boundaries_dir)?);
    metrics::set_boundary_segments(network.len());
    let engine = Arc::new(BoundaryDistanceEngine::with_search_radius(network, config.boundaries.search_radius_m()));

    let started = Instant::now();
    let batch = tokio::task::spawn_blocking(move || engine.enrich_all(&points)).await?;
    info!("Enrichment took {:.2?}", started.elapsed());

    if !batch.failures.is_empty() {
        warn!("{} events could not be enriched and are written without boundary fields", batch.failures.len());
    }

    export::write_feature_collection(output, &batch.points).await?;
    Ok(())
}
