//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `DEBB_`-prefixed environment variables, each layer overriding the
//! previous one.

pub mod error;

use crate::error::{ErrorKind, Result};
use debb_engine::SiteContext;
use debb_rehost::RehostConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const ENV_PREFIX: &str = "DEBB_";

/// Everything tunable about a run. All fields have working defaults, so an
/// absent configuration file is not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fixed site context to convert under. Normally unset: the context is
    /// derived from the page URL given on the command line.
    pub site: Option<SiteContext>,
    pub rehost: RehostConfig,
    /// Link cache location. Defaults to `linkcache.txt` in the platform
    /// cache directory.
    pub cache_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration, merging defaults, the TOML file (the explicit
    /// path if given, otherwise the per-user default location) and the
    /// environment. `DEBB_REHOST__POOL_SIZE=4` style variables map onto
    /// nested fields.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = explicit
            .map(Path::to_path_buf)
            .or_else(default_config_file);
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = &file {
            debug!(path = %path.display(), "merging configuration file");
            figment = figment.merge(Toml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ErrorKind::Load)?;
        Ok(config)
    }

    /// The link cache path to use, falling back to the platform default.
    pub fn cache_file(&self) -> PathBuf {
        self.cache_file.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "debb")
                .map(|dirs| dirs.cache_dir().join("linkcache.txt"))
                .unwrap_or_else(|| PathBuf::from("linkcache.txt"))
        })
    }
}

fn default_config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "debb")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
