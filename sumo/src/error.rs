use thiserror::Error;

use crate::scenarios::ToolError;

/// Everything that can stop a single injection run or scenario. None of these are retried; the
/// caller reports them and moves on.
#[derive(Debug, Error)]
pub enum Error {
    /// The parking areas are missing or unusable, or the injection settings are out of range.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("no <vehicle> elements found in {0}")]
    NoVehiclesFound(String),
    #[error("{path} isn't well-formed XML: {reason}")]
    MalformedDocument { path: String, reason: String },
    #[error("couldn't serialize XML: {0}")]
    Serialize(String),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
