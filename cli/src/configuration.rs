use std::path::Path;

use anyhow::{Context, Result};

use sumo::PipelineConfig;

const DEFAULT_PATH: &str = "scenarios.toml";

/// Reads pipeline settings from TOML. An explicitly requested file has to exist; the default one
/// is optional, and without it the built-in settings are used. A file that exists but doesn't
/// parse is always an error.
pub fn load_configuration(path: Option<String>) -> Result<PipelineConfig> {
    let path = match path {
        Some(path) => path,
        None => {
            if !Path::new(DEFAULT_PATH).exists() {
                info!("No {} found, using the default scenarios", DEFAULT_PATH);
                return Ok(PipelineConfig::default());
            }
            DEFAULT_PATH.to_string()
        }
    };
    let text = fs_err::read_to_string(&path)?;
    let config = parse_configuration(&text).with_context(|| format!("reading {}", path))?;
    info!("Loaded settings from {}", path);
    Ok(config)
}

fn parse_configuration(text: &str) -> Result<PipelineConfig> {
    Ok(toml::from_str(text)?)
}
