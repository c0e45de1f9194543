//! Application configuration loading from config.toml and the environment
//!
//! Every setting has a default, so a missing `config.toml` is fine. Environment variables
//! (possibly loaded from `.env`) override the file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{io::ErrorKind, path::Path, path::PathBuf};
use tracing::{debug, info};

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "MACRO_BUDDY_CONFIG";
/// Environment override for [`AppConfig::api_base_url`]
pub const API_URL_ENV: &str = "MACRO_BUDDY_API_URL";
/// Environment override for [`AppConfig::request_timeout_secs`]
pub const TIMEOUT_ENV: &str = "MACRO_BUDDY_TIMEOUT_SECS";
/// Environment override for [`AppConfig::data_dir`]
pub const DATA_DIR_ENV: &str = "MACRO_BUDDY_DATA_DIR";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the nutrition source
    pub api_base_url: String,
    /// Timeout applied to every nutrition-source request
    pub request_timeout_secs: u64,
    /// Maximum number of results requested per search
    pub page_size: u32,
    /// `User-Agent` sent to the nutrition source
    pub user_agent: String,
    /// Directory holding the persisted favorites and ledger
    pub data_dir: PathBuf,
    /// Daily macro targets used for the summary ring charts
    pub goals: MacroGoals,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://world.openfoodfacts.org".to_string(),
            request_timeout_secs: 10,
            page_size: 20,
            user_agent: concat!("macro-buddy/", env!("CARGO_PKG_VERSION")).to_string(),
            data_dir: PathBuf::from("data"),
            goals: MacroGoals::default(),
        }
    }
}

/// Daily targets for each macro
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MacroGoals {
    /// Energy target in kcal
    pub calories: f64,
    /// Protein target in grams
    pub protein: f64,
    /// Carbohydrate target in grams
    pub carbs: f64,
    /// Fat target in grams
    pub fat: f64,
}

impl Default for MacroGoals {
    fn default() -> Self {
        Self {
            calories: 2000.0,
            protein: 50.0,
            carbs: 260.0,
            fat: 70.0,
        }
    }
}

/// Parses configuration from TOML text.
///
/// # Errors
/// Returns [`Error::Config`] if the TOML is invalid or a field has the wrong type.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file. A missing file yields the defaults.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path);
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No config file at {:?}, using defaults", path);
            Ok(AppConfig::default())
        }
        Err(e) => Err(Error::Config {
            message: format!("Failed to read config file {}: {e}", path.display()),
        }),
    }
}

/// Applies environment overrides to `config`, reading variables through `lookup`.
///
/// # Errors
/// Returns [`Error::Config`] if a numeric override does not parse.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(API_URL_ENV) {
        config.api_base_url = url;
    }
    if let Some(raw) = lookup(TIMEOUT_ENV) {
        config.request_timeout_secs = raw.trim().parse().map_err(|e| Error::Config {
            message: format!("Invalid {TIMEOUT_ENV} value '{raw}': {e}"),
        })?;
    }
    if let Some(dir) = lookup(DATA_DIR_ENV) {
        config.data_dir = PathBuf::from(dir);
    }
    Ok(config)
}

/// Loads the full application configuration: `.env`, then the config file
/// (`$MACRO_BUDDY_CONFIG` or `./config.toml`), then environment overrides.
///
/// # Errors
/// Returns [`Error::Config`] if the file or an override is invalid.
pub fn load_app_configuration() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
    let config = apply_env_overrides(load_config(&path)?, |key| std::env::var(key).ok())?;
    info!(
        "Configuration loaded: source={}, timeout={}s, data_dir={:?}",
        config.api_base_url, config.request_timeout_secs, config.data_dir
    );
    Ok(config)
}
