pub mod rate_limiter;
pub mod retry;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::models::common::Config;

const ENV_PREFIX: &str = "ETHERSEEK";

/// Load settings from an optional YAML file, overridden by `ETHERSEEK_*` variables.
pub fn load_config<P: AsRef<Path>>(file_name: P) -> Result<Config> {
    let config_path = file_name.as_ref();
    if config_path.exists() {
        info!("Config path: {}", config_path.to_string_lossy());
    } else {
        info!(
            "Config file {} not found, using defaults",
            config_path.to_string_lossy()
        );
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(config_path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to read config file")?;

    let config: Config = settings
        .try_deserialize()
        .context("failed to parse config YAML")?;

    Ok(config)
}

fn strip_html(error: &str) -> String {
    // Explorer and urlscan gateways answer some failures with an HTML error page
    if error.contains("<!doctype html>") || error.contains("<html>") {
        error
            .lines()
            .map(|line| line.trim())
            .find(|line| {
                !line.starts_with('<')
                    && !line.ends_with('>')
                    && !line.is_empty()
                    && *line != "html"
                    && *line != "body"
            })
            .unwrap_or(error)
            .to_string()
    } else {
        error.to_string()
    }
}
