//! # Configuration loader
//!
//! Reads a TOML file into the [`AppConfig`] DTO and reports I/O and parse
//! errors with context. No validation and no default values: whatever is in
//! the file is taken as fact.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use pd_core::config::AppConfig;

/// Environment variable naming the config file. Read after `.env` is loaded.
pub const CONFIG_ENV_VAR: &str = "PROPDESK_CONFIG";

const APP_DIR_NAME: &str = "propdesk";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_config(config_path: PathBuf) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    AppConfig::from_toml(&toml_value)
}

/// Per-user data directory, e.g. `~/.local/share/propdesk`.
pub fn app_data_dir() -> anyhow::Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .context("Failed to determine the local data directory")
}

/// Pick the config file: explicit path, then `$PROPDESK_CONFIG`, then
/// `<data dir>/config.toml` when it exists.
pub fn resolve_config_path(
    explicit: Option<PathBuf>,
    env_value: Option<OsString>,
    data_dir: Option<&Path>,
) -> Option<PathBuf> {
    explicit
        .or_else(|| env_value.filter(|v| !v.is_empty()).map(PathBuf::from))
        .or_else(|| {
            data_dir
                .map(|dir| dir.join(CONFIG_FILE_NAME))
                .filter(|path| path.is_file())
        })
}

/// Load `.env`, then the config file if one is found.
///
/// Without a config file the result is [`AppConfig::with_system_defaults`].
pub fn load_app_config(explicit: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();

    let data_dir = app_data_dir().ok();
    let path = resolve_config_path(
        explicit,
        std::env::var_os(CONFIG_ENV_VAR),
        data_dir.as_deref(),
    );
    match path {
        Some(path) => load_config(path),
        None => Ok(AppConfig::with_system_defaults(app_data_dir()?)),
    }
}
