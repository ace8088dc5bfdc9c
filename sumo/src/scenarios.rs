//! Generates one parking scenario per configured traffic level: random trips, then routes, then
//! parking stops. Trip generation and routing are delegated to SUMO's own tools through the
//! `ExternalTool` trait.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;

use parkutil::Timer;

use crate::{inject_file, Error, InjectionConfig, InjectionSummary, ParkingCatalog, Result};

/// Seeds are spaced out per scenario, so each one can be reproduced on its own from the base
/// seed.
pub fn scenario_seed(base_seed: u64, index: usize) -> u64 {
    base_seed.wrapping_add((index as u64).wrapping_mul(1000))
}

/// One traffic level to generate.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    /// Seconds between generated trips; smaller is busier
    pub period: f64,
    pub park_rate: f64,
    pub dur_min: u32,
    pub dur_max: u32,
}

impl ScenarioSpec {
    fn new(name: &str, period: f64, park_rate: f64, dur_min: u32, dur_max: u32) -> ScenarioSpec {
        ScenarioSpec {
            name: name.to_string(),
            period,
            park_rate,
            dur_min,
            dur_max,
        }
    }

    pub fn injection_config(&self, seed: u64) -> InjectionConfig {
        InjectionConfig {
            rate: self.park_rate,
            duration_min: self.dur_min,
            duration_max: self.dur_max,
            seed,
        }
    }
}

/// Fixed inputs for the whole pipeline. Every field has a default, so a config file only needs
/// to list what differs.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub net_file: PathBuf,
    pub python: String,
    pub random_trips_script: PathBuf,
    pub router: String,
    /// Passed to the trip generator to weight sources and destinations
    pub weights_prefix: String,
    pub parking_file: PathBuf,
    /// When the trip generator stops departing vehicles, in seconds
    pub sim_end: u32,
    pub trips_dir: PathBuf,
    pub routes_dir: PathBuf,
    pub vehicle_class: String,
    #[serde(rename = "scenario")]
    pub scenarios: Vec<ScenarioSpec>,
}

impl Default for PipelineConfig {
    fn default() -> PipelineConfig {
        PipelineConfig {
            net_file: PathBuf::from("osm.net.xml"),
            python: "python".to_string(),
            random_trips_script: PathBuf::from("scripts/randomTrips.py"),
            router: "duarouter".to_string(),
            weights_prefix: "prob/prob".to_string(),
            parking_file: PathBuf::from("additionals/parkingAreas.add.xml"),
            sim_end: 6000,
            trips_dir: PathBuf::from("trips"),
            routes_dir: PathBuf::from("routes"),
            vehicle_class: "passenger".to_string(),
            scenarios: vec![
                ScenarioSpec::new("busy", 5.0, 0.7, 300, 1200),
                ScenarioSpec::new("default", 10.0, 0.5, 600, 1800),
                ScenarioSpec::new("quiet", 15.0, 0.3, 900, 2400),
            ],
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scenarios.is_empty() {
            return Err(Error::Configuration("no scenarios configured".to_string()));
        }
        let mut names = BTreeSet::new();
        for scenario in &self.scenarios {
            if scenario.name.is_empty() || scenario.name.contains(std::path::is_separator) {
                return Err(Error::Configuration(format!(
                    "scenario name {:?} can't be used in a filename",
                    scenario.name
                )));
            }
            if !names.insert(scenario.name.as_str()) {
                return Err(Error::Configuration(format!(
                    "scenario {} is listed twice",
                    scenario.name
                )));
            }
            if !(scenario.period > 0.0) {
                return Err(Error::Configuration(format!(
                    "scenario {} needs a positive period",
                    scenario.name
                )));
            }
            // Seed doesn't matter for checking ranges
            scenario.injection_config(0).validate()?;
        }
        Ok(())
    }

    pub fn trips_path(&self, scenario: &ScenarioSpec) -> PathBuf {
        self.trips_dir
            .join(format!("car_parking_{}.trips.xml", scenario.name))
    }

    pub fn raw_routes_path(&self, scenario: &ScenarioSpec) -> PathBuf {
        self.routes_dir
            .join(format!("parking_{}.rou.xml", scenario.name))
    }

    pub fn final_routes_path(&self, scenario: &ScenarioSpec) -> PathBuf {
        self.routes_dir
            .join(format!("parking_{}_withstops.rou.xml", scenario.name))
    }

    pub fn trip_invocation(&self, scenario: &ScenarioSpec) -> ToolInvocation {
        let trips = self.trips_path(scenario);
        ToolInvocation {
            program: self.python.clone(),
            args: vec![
                path_arg(&self.random_trips_script),
                "-n".to_string(),
                path_arg(&self.net_file),
                "-o".to_string(),
                path_arg(&trips),
                "-p".to_string(),
                scenario.period.to_string(),
                "-e".to_string(),
                self.sim_end.to_string(),
                "--prefix".to_string(),
                format!("cp_{}_", scenario.name),
                "--vehicle-class".to_string(),
                self.vehicle_class.clone(),
                "--trip-attributes".to_string(),
                format!("guiShape='{}'", self.vehicle_class),
                "--weights-prefix".to_string(),
                self.weights_prefix.clone(),
                "--intermediate".to_string(),
                "1".to_string(),
            ],
            produces: trips,
        }
    }

    pub fn route_invocation(&self, scenario: &ScenarioSpec) -> ToolInvocation {
        let routes = self.raw_routes_path(scenario);
        ToolInvocation {
            program: self.router.clone(),
            args: vec![
                "-n".to_string(),
                path_arg(&self.net_file),
                "--route-files".to_string(),
                path_arg(&self.trips_path(scenario)),
                "-o".to_string(),
                path_arg(&routes),
                "--remove-loops".to_string(),
                "--ignore-errors".to_string(),
            ],
            produces: routes,
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// A request to run some program that's expected to create one file.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub produces: PathBuf,
}

impl ToolInvocation {
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    pub fn describe(&self) -> String {
        parkutil::describe_cmd(&self.to_command())
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("couldn't start {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} failed with {status}")]
    Failed { command: String, status: String },
    #[error("{command} succeeded, but didn't create {}", .output.display())]
    MissingOutput { command: String, output: PathBuf },
}

/// Something that can carry out a `ToolInvocation`. The pipeline doesn't care how.
pub trait ExternalTool {
    fn run(&mut self, invocation: &ToolInvocation) -> Result<(), ToolError>;
}

/// Runs invocations as real child processes.
pub struct CommandTool;

impl ExternalTool for CommandTool {
    fn run(&mut self, invocation: &ToolInvocation) -> Result<(), ToolError> {
        // A leftover from an earlier run mustn't pass for this run's output
        remove_stale_output(&invocation.produces).map_err(|source| ToolError::Spawn {
            command: invocation.describe(),
            source,
        })?;
        let status = parkutil::run_cmd(&mut invocation.to_command()).map_err(|source| {
            ToolError::Spawn {
                command: invocation.describe(),
                source,
            }
        })?;
        if !status.success() {
            return Err(ToolError::Failed {
                command: invocation.describe(),
                status: status.to_string(),
            });
        }
        if !invocation.produces.exists() {
            return Err(ToolError::MissingOutput {
                command: invocation.describe(),
                output: invocation.produces.clone(),
            });
        }
        Ok(())
    }
}

fn remove_stale_output(path: &Path) -> std::io::Result<()> {
    match fs_err::remove_file(path) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// What happened to one scenario in a batch.
#[derive(Debug)]
pub struct ScenarioReport {
    pub name: String,
    pub seed: u64,
    pub output: PathBuf,
    pub result: Result<InjectionSummary>,
}

/// Generates every configured scenario in order. The parking catalog is loaded once up-front; if
/// that fails, nothing runs. After that, a failing scenario is logged and recorded in its report,
/// and the batch moves on to the next one.
pub fn run_batch(
    config: &PipelineConfig,
    base_seed: u64,
    tool: &mut dyn ExternalTool,
    timer: &mut Timer,
) -> Result<Vec<ScenarioReport>> {
    config.validate()?;
    fs_err::create_dir_all(&config.trips_dir)?;
    fs_err::create_dir_all(&config.routes_dir)?;
    let catalog = ParkingCatalog::load(&config.parking_file, timer)?;

    let mut reports = Vec::new();
    for (index, scenario) in config.scenarios.iter().enumerate() {
        let seed = scenario_seed(base_seed, index);
        let span = format!("generate {} scenario", scenario.name);
        timer.start(span.clone());
        let result = run_scenario(config, scenario, seed, &catalog, tool, timer);
        timer.stop(span);

        if let Err(ref err) = result {
            error!("The {} scenario failed: {}", scenario.name, err);
        }
        reports.push(ScenarioReport {
            name: scenario.name.clone(),
            seed,
            output: config.final_routes_path(scenario),
            result,
        });
    }
    Ok(reports)
}

fn run_scenario(
    config: &PipelineConfig,
    scenario: &ScenarioSpec,
    seed: u64,
    catalog: &ParkingCatalog,
    tool: &mut dyn ExternalTool,
    timer: &mut Timer,
) -> Result<InjectionSummary> {
    tool.run(&config.trip_invocation(scenario))?;
    tool.run(&config.route_invocation(scenario))?;
    inject_file(
        config.raw_routes_path(scenario),
        catalog,
        &scenario.injection_config(seed),
        config.final_routes_path(scenario),
        timer,
    )
}
