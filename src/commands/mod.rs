pub mod enrich;
pub mod fetch;
pub mod merge;
pub mod zone;

use clap::{Arg, ArgMatches, Command};
use color_eyre::eyre::Result;
use faultline::config::Config;
use faultline::core::types::{DateRange, Magnitude};
use faultline::error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Register all application commands
pub fn register_commands(app: Command) -> Command {
    app.subcommand(fetch::register_command())
        .subcommand(merge::register_command())
        .subcommand(enrich::register_command())
        .subcommand(zone::register_command())
}

/// Handle all application commands
pub async fn handle_commands(matches: ArgMatches, config: &Config) -> Result<()> {
    match matches.subcommand() {
        Some(("fetch", args)) => fetch::execute(config, args).await,
        Some(("merge", args)) => merge::execute(config, args).await,
        Some(("enrich", args)) => enrich::execute(config, args).await,
        Some(("zone", args)) => zone::execute(args),
        _ => {
            println!("Please specify a subcommand. Use --help for more information.");
            Ok(())
        },
    }
}

/// `--start`, `--end` and `--min-magnitude`, shared by the catalog commands
pub(crate) fn with_range_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("start")
                .long("start")
                .help("First day of the range (YYYY-MM-DD)")
                .required(true)
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("end")
                .long("end")
                .help("Last day of the range, inclusive (YYYY-MM-DD)")
                .required(true)
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            Arg::new("min_magnitude")
                .long("min-magnitude")
                .help("Minimum magnitude threshold (defaults to acquisition.min_magnitude)")
                .value_parser(clap::value_parser!(f64)),
        )
}

pub(crate) fn parse_range_args(args: &ArgMatches, config: &Config) -> error::Result<(DateRange, Magnitude)> {
    let start = args.get_one::<String>("start").map(String::as_str).unwrap_or_default();
    let end = args.get_one::<String>("end").map(String::as_str).unwrap_or_default();
    let range = DateRange::parse(start, end)?;

    let magnitude = match args.get_one::<f64>("min_magnitude") {
        Some(value) => Magnitude::new(*value)?,
        None => config.min_magnitude()?,
    };
    Ok((range, magnitude))
}

/// Token cancelled on Ctrl-C so pending days are abandoned
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, abandoning days that have not started");
            child.cancel();
        }
    });
    token
}
