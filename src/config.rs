//! Layered runtime settings.
//!
//! Sources merge in order, later ones winning:
//! 1. built-in defaults
//! 2. `config.toml` in the platform config directory (or an explicit path)
//! 3. `DELIVERY_*` environment variables (e.g. `DELIVERY_API_BASE_URL`)

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::infra::{cache::CALCULATION_CACHE_TTL, delivery_api::DEFAULT_BASE_URL};

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "Marketplace";
const APP_NAME: &str = "DeliveryQuotes";
const CONFIG_FILENAME: &str = "config.toml";
const ENV_PREFIX: &str = "DELIVERY_";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub calculation_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 15,
            calculation_ttl_secs: CALCULATION_CACHE_TTL.as_secs(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn calculation_ttl(&self) -> Duration {
        Duration::from_secs(self.calculation_ttl_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Figment(Box::new(err))
    }
}

/// Default config file location, if the platform exposes one.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

/// Load settings from defaults, the default config file and the environment.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(default_config_file().as_deref())
}

/// Like [`load_settings`] but reading `path` instead of the default file.
/// A missing file is skipped.
pub fn load_settings_from(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

    if let Some(path) = path {
        if path.exists() {
            debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Toml::file(path));
        }
    }

    let settings: Settings = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.api_base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api_base_url must not be empty".into()));
    }
    if settings.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("request_timeout_secs must be positive".into()));
    }
    Ok(())
}
