//! Tools for preparing SUMO parking scenarios. These are bundled as a single executable.

#[macro_use]
extern crate log;

mod configuration;
mod generate_scenarios;
mod inject_stops;

use anyhow::Result;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "parkcli", about = "Parking demand tools for SUMO scenarios")]
enum Command {
    /// Sends some of the vehicles in a route file to park at a parking area for a while.
    ///
    /// Vehicles that already have a stop are left alone, so running this again on its own output
    /// changes nothing.
    InjectStops {
        /// Input route file (.rou.xml)
        #[structopt(long)]
        routes: String,
        /// Parking areas additional file (.add.xml)
        #[structopt(long)]
        add: String,
        /// Output route file (.rou.xml)
        #[structopt(long)]
        out: String,
        /// Fraction of vehicles to park, between 0 and 1
        #[structopt(long, default_value = "0.5")]
        rate: f64,
        /// Minimum parking duration, in seconds
        #[structopt(long, default_value = "500")]
        dur_min: u32,
        /// Maximum parking duration, in seconds
        #[structopt(long, default_value = "3000")]
        dur_max: u32,
        /// A seed for generating random numbers
        #[structopt(long, default_value = "42")]
        seed: u64,
    },
    /// Generates trips, routes, and parking stops for every configured scenario.
    ///
    /// This runs SUMO's randomTrips.py and duarouter, so both must be available.
    GenerateScenarios {
        /// The base seed. Each scenario uses this plus 1000 times its position in the list.
        #[structopt(long, default_value = "42")]
        seed: u64,
        /// A TOML file overriding the default paths and scenarios. If omitted, scenarios.toml is
        /// used when it exists.
        #[structopt(long)]
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    parkutil::logger::setup();

    match Command::from_args() {
        Command::InjectStops {
            routes,
            add,
            out,
            rate,
            dur_min,
            dur_max,
            seed,
        } => inject_stops::run(
            routes,
            add,
            out,
            sumo::InjectionConfig {
                rate,
                duration_min: dur_min,
                duration_max: dur_max,
                seed,
            },
        )?,
        Command::GenerateScenarios { seed, config } => generate_scenarios::run(seed, config)?,
    }
    Ok(())
}
