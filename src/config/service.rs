//! Configuration service abstraction and the production implementation.
//!
//! The production service layers a TOML file (default:
//! `~/.config/hantone/config.toml`) under `HANTONE_*` environment-variable
//! overrides using the `config` crate, then validates the result.

use super::{Config, validate_config};
use crate::{Result, error::HanToneError};
use log::debug;
use std::path::PathBuf;
use std::sync::Mutex;

/// Environment variable prefix for overrides, e.g.
/// `HANTONE_STT__WHISPER__API_KEY`.
const ENV_PREFIX: &str = "HANTONE";

/// Service interface for configuration access.
///
/// Components receive a `&dyn ConfigService` (usually through the component
/// factory) instead of reading global state, which keeps tests hermetic.
pub trait ConfigService: Send + Sync {
    /// Load (or return the cached) validated configuration.
    fn get_config(&self) -> Result<Config>;

    /// Drop any cached configuration so the next access reloads it.
    fn reload(&self) -> Result<()>;
}

/// Production configuration service.
pub struct ProductionConfigService {
    config_path: PathBuf,
    cached: Mutex<Option<Config>>,
}

impl ProductionConfigService {
    /// Create a service reading the default config file location.
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_path: Self::default_config_path()?,
            cached: Mutex::new(None),
        })
    }

    /// Create a service reading a specific config file.
    pub fn with_custom_file(config_path: PathBuf) -> Self {
        Self {
            config_path,
            cached: Mutex::new(None),
        }
    }

    /// Default config file path under the user config directory.
    pub fn default_config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| HanToneError::config("cannot determine config directory"))?;
        Ok(base.join("hantone").join("config.toml"))
    }

    /// Path this service reads from.
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    fn load(&self) -> Result<Config> {
        // Defaults form the base layer so partial files and sparse
        // environment overrides always deserialize into a full tree.
        let defaults = toml::to_string(&Config::default())
            .map_err(|e| HanToneError::config(format!("default serialization: {e}")))?;
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(&defaults, config::FileFormat::Toml));

        if self.config_path.is_file() {
            debug!("Loading configuration from {}", self.config_path.display());
            builder = builder.add_source(
                config::File::from(self.config_path.clone()).format(config::FileFormat::Toml),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let raw = builder
            .build()
            .map_err(|e| HanToneError::config(format!("configuration loading: {e}")))?;
        let mut loaded: Config = raw
            .try_deserialize()
            .map_err(|e| HanToneError::config(format!("configuration parsing: {e}")))?;

        if self.config_path.is_file() {
            loaded.loaded_from = Some(self.config_path.clone());
        }
        validate_config(&loaded)?;
        Ok(loaded)
    }
}

impl ConfigService for ProductionConfigService {
    fn get_config(&self) -> Result<Config> {
        let mut cached = self.cached.lock().expect("config cache lock");
        if let Some(config) = cached.as_ref() {
            return Ok(config.clone());
        }
        let loaded = self.load()?;
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    fn reload(&self) -> Result<()> {
        let mut cached = self.cached.lock().expect("config cache lock");
        *cached = None;
        Ok(())
    }
}
