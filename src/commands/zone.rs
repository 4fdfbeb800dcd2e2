use clap::{Arg, ArgMatches, Command};
use color_eyre::eyre::{Result, eyre};
use faultline::geo::resolve_zone;

/// Register zone command
pub fn register_command() -> Command {
    Command::new("zone")
        .about("Show the UTM zone used to measure distances around a coordinate")
        .arg(
            Arg::new("lon")
                .long("lon")
                .help("Longitude in degrees")
                .required(true)
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("lat")
                .long("lat")
                .help("Latitude in degrees")
                .required(true)
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(f64)),
        )
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let lon = *args.get_one::<f64>("lon").ok_or_else(|| eyre!("--lon is required"))?;
    let lat = *args.get_one::<f64>("lat").ok_or_else(|| eyre!("--lat is required"))?;

    let zone = resolve_zone(lon, lat)?;
    println!("{} (EPSG:{}, central meridian {})", zone, zone.epsg(), zone.central_meridian());
    Ok(())
}
