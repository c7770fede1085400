pub mod plan;
pub mod publish;

use std::path::Path;

use anyhow::Context;
use fanout_core::{ConfigBundle, FanoutConfig};
use tracing::debug;

/// Tables published when no --config is given.
const BUILTIN: &str = include_str!("../../fanout.toml");

pub fn load_bundle(path: Option<&Path>) -> anyhow::Result<ConfigBundle> {
    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            FanoutConfig::from_file(path)?
        }
        None => {
            debug!("loading built-in configuration");
            FanoutConfig::from_toml_str(BUILTIN).context("built-in configuration")?
        }
    };
    Ok(config.into_bundle()?)
}
