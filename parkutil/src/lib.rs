//! Small helpers shared by the parking tools: logging setup, timing, running external commands,
//! and formatting numbers for reports.

#[macro_use]
extern crate log;

pub mod logger;
mod process;
mod time;
mod utils;

pub use crate::process::{describe_cmd, run_cmd};
pub use crate::time::{elapsed_seconds, prettyprint_time, Timer};
pub use crate::utils::prettyprint_usize;
