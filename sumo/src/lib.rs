//! This crate prepares parking demand for the [SUMO](https://www.eclipse.org/sumo/) traffic
//! simulator. The core piece takes a route file (`.rou.xml`) and a file of parking areas
//! (`.add.xml`) and, reproducibly from a seed, sends some of the vehicles to park somewhere for a
//! while. Around that, `scenarios` drives SUMO's own trip generator and router to produce one
//! route file per traffic level, and injects stops into each.

#[macro_use]
extern crate log;

pub use self::error::{Error, Result};
pub use self::inject::{
    inject_file, inject_stops, InjectedStop, InjectionConfig, InjectionSummary, Stop,
};
pub use self::parking::{ParkingArea, ParkingCatalog};
pub use self::scenarios::{
    run_batch, scenario_seed, CommandTool, ExternalTool, PipelineConfig, ScenarioReport,
    ScenarioSpec, ToolError, ToolInvocation,
};
pub use self::xml::{Document, Element, Node};

mod error;
mod inject;
mod parking;
pub mod scenarios;
pub mod xml;
