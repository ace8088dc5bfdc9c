use anyhow::{bail, Result};

use parkutil::{prettyprint_usize, Timer};
use sumo::CommandTool;

use crate::configuration::load_configuration;

pub fn run(base_seed: u64, config_path: Option<String>) -> Result<()> {
    let config = load_configuration(config_path)?;
    let mut timer = Timer::new("generate parking scenarios");
    let reports = sumo::run_batch(&config, base_seed, &mut CommandTool, &mut timer)?;
    drop(timer);

    println!();
    let mut failed = 0;
    for report in &reports {
        match report.result {
            Ok(ref summary) => println!(
                "{} (seed {}): {} of {} vehicles park ({:.1}%), wrote {}",
                report.name,
                report.seed,
                prettyprint_usize(summary.injected()),
                prettyprint_usize(summary.vehicles),
                summary.percent_injected(),
                report.output.display()
            ),
            Err(ref err) => {
                failed += 1;
                println!("{} (seed {}): FAILED: {}", report.name, report.seed, err);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} scenarios failed", failed, reports.len());
    }
    println!("All scenarios generated successfully.");
    Ok(())
}
