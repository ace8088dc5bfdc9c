use anyhow::Result;

use parkutil::{prettyprint_usize, Timer};
use sumo::{InjectionConfig, ParkingCatalog};

pub fn run(routes: String, add: String, out: String, config: InjectionConfig) -> Result<()> {
    let mut timer = Timer::new("inject parking stops");
    let catalog = ParkingCatalog::load(&add, &mut timer)?;
    let summary = sumo::inject_file(&routes, &catalog, &config, &out, &mut timer)?;

    println!("Vehicles found: {}", prettyprint_usize(summary.vehicles));
    println!(
        "Parking stops injected: {} ({:.1}%)",
        prettyprint_usize(summary.injected()),
        summary.percent_injected()
    );
    println!("Wrote: {}", out);
    Ok(())
}
