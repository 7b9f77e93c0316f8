use clap::Parser;

use bus_routing::config::Config;
use bus_routing::gtfs::geojson;
use bus_routing::layers::{city::City, error::Error};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Stops table (stop_id, stop_lat, stop_lon, stop_name)
    #[arg(long)]
    stops: String,

    /// Trip-stop table (trip_id, stop_id), rows in stop order
    #[arg(long)]
    stop_times: String,

    /// Driver roster to assign and rewrite in place
    #[arg(long)]
    roster: Option<String>,

    /// JSON config file, defaults to the Delhi region
    #[arg(long)]
    config: Option<String>,

    /// Where to write the route GeoJSON
    #[arg(long)]
    output: Option<String>,
}

fn run(args: Args) -> Result<(), Error> {
    let config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    println!("Building city from {} and {}", args.stops, args.stop_times);
    let city = City::load(config, &args.stops, &args.stop_times)?;
    city.print_stats();

    println!("Stitching routes");
    let report = city.stitch_routes();
    report.print_stats();
    for failure in report.failures.iter() {
        log::warn!("Route {} not drawn: {}", failure.trip_id, failure.error);
    }

    if let Some(output) = &args.output {
        let features = geojson::get_all_features(&city, &report.routes);
        let file = std::fs::File::create(output)?;
        serde_json::to_writer(file, &geojson::convert_to_geojson(&features))?;
        log::info!("Wrote {} features to {}", features.len(), output);
    }

    if let Some(roster) = &args.roster {
        let assigner = city.driver_assigner();
        assigner.pool().print_stats();
        let assignments = assigner.assign_and_persist(roster)?;
        println!("Assigned {} drivers", assignments.len());
        for (driver_id, assignment) in assignments.iter() {
            println!("  {} -> {} ({})", driver_id, assignment.bus_id, assignment.zone);
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
