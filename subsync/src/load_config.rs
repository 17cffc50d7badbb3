/// `load_config` module: loads the YAML run configuration into the core [`SyncConfig`].
///
/// This is the only place where a user-supplied YAML file is parsed. Secrets
/// never live in this file; the publisher reads them from the environment.
///
/// # Errors
/// All errors use `anyhow::Error` with the offending path attached and are
/// surfaced at the CLI boundary.
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use subsync_core::config::SyncConfig;
use tracing::{error, info};

/// Load `path` if given, otherwise fall back to the built-in defaults.
pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<SyncConfig> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => {
            info!("No config file given, using built-in sources");
            SyncConfig::default()
        }
    };
    config.trace_loaded();
    Ok(config)
}

/// Loads a static YAML config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SyncConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            e
        })
        .with_context(|| format!("Failed to read config file {}", path_ref.display()))?;

    let config: SyncConfig = serde_yaml::from_str(&config_content)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            e
        })
        .with_context(|| format!("Failed to parse config YAML {}", path_ref.display()))?;

    if config.sources.is_empty() {
        error!(config_path = ?path_ref, "Config lists no sources");
        bail!("Config file {} lists no sources", path_ref.display());
    }

    info!(config_path = ?path_ref, sources = config.sources.len(), "Parsed config YAML successfully");
    Ok(config)
}
