//! Configuration loading and discovery for `fryfall.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::FryfallConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory and its parents
pub const CONFIG_FILE_NAME: &str = "fryfall.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse fryfall.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub dpr: Option<f64>,
    pub fps: Option<u32>,
    pub frames: Option<u32>,
    pub seed: Option<u64>,
    pub reduced_motion: Option<bool>,
}

/// Find fryfall.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for fryfall.toml
/// 2. Check XDG_CONFIG_HOME/fryfall/fryfall.toml (or ~/.config/fryfall/fryfall.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find fryfall.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("fryfall").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find fryfall.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a fryfall.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses
/// [`find_config`] to locate one. If no config file is found, returns the
/// default configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(Some(Path::new("site/fryfall.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<(FryfallConfig, Option<PathBuf>), ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            let config = load_config_file(&p)?;
            log::debug!("loaded config from {}", p.display());
            Ok((config, Some(p)))
        }
        None => Ok((default_config(), None)),
    }
}

fn load_config_file(path: &Path) -> Result<FryfallConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: FryfallConfig = toml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Turn collected validation problems into a single error.
pub fn validate_config(config: &FryfallConfig) -> Result<(), ConfigError> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
    }
}

/// The configuration used when no fryfall.toml is found
pub fn default_config() -> FryfallConfig {
    FryfallConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut FryfallConfig, overrides: &CliOverrides) {
    if let Some(width) = overrides.width {
        config.render.width = width;
    }
    if let Some(height) = overrides.height {
        config.render.height = height;
    }
    if let Some(dpr) = overrides.dpr {
        config.render.dpr = dpr;
    }
    if let Some(fps) = overrides.fps {
        config.render.fps = fps;
    }
    if let Some(frames) = overrides.frames {
        config.render.frames = frames;
    }
    if let Some(seed) = overrides.seed {
        config.render.seed = Some(seed);
    }
    if let Some(reduced) = overrides.reduced_motion {
        config.render.reduced_motion = reduced;
    }
}
