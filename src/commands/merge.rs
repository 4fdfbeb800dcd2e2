use clap::{Arg, ArgMatches, Command};
use color_eyre::eyre::{Result, eyre};
use faultline::{
    cache::DiskCacheStore,
    config::Config,
    export,
    merge::CatalogMerger,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Register merge command
pub fn register_command() -> Command {
    super::with_range_args(Command::new("merge").about("Merge cached daily units into one GeoJSON file")).arg(
        Arg::new("output")
            .long("output")
            .short('o')
            .help("Destination GeoJSON file")
            .required(true)
            .value_parser(clap::value_parser!(PathBuf)),
    )
}

/// Merge whatever the cache holds for the range
pub async fn execute(config: &Config, args: &ArgMatches) -> Result<()> {
    let (range, magnitude) = super::parse_range_args(args, config)?;
    let output = args.get_one::<PathBuf>("output").ok_or_else(|| eyre!("--output is required"))?;

    let merger = CatalogMerger::new(Arc::new(DiskCacheStore::new(&config.cache.root)));
    let outcome = merger.merge(range, magnitude, None).await?;
    if outcome.is_empty() {
        warn!("Nothing cached for {}; run fetch first. {} not written", range, output.display());
        return Ok(());
    }

    export::write_feature_collection(output, outcome.points()).await?;
    Ok(())
}
