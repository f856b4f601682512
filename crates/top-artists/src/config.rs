//! Application configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variables
//! 2. TOML file (`--config <path>`, or `top-artists.toml` in the working directory)
//! 3. Built-in defaults
//!
//! ## Environment variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `LASTFM_API_KEY` | none | API key, required by `run` |
//! | `LASTFM_USER` | none | Last.fm user name, required by `run` |
//! | `LASTFM_PERIOD` | `1month` | Chart period |
//! | `LASTFM_LIMIT` | `15` | Artists requested per fetch |
//! | `LISTENING_HISTORY_PATH` | `site/listening_history.csv` | CSV history file |
//! | `SITE_OUTPUT_DIR` | `site` | Directory for `index.html` and `history.json` |

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use continuity::Palette;
use serde::Deserialize;

use crate::lastfm::Period;
use crate::processor::MAX_ARTISTS;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "top-artists.toml";
const DEFAULT_HISTORY_PATH: &str = "site/listening_history.csv";
const DEFAULT_OUTPUT_DIR: &str = "site";

const ENV_API_KEY: &str = "LASTFM_API_KEY";
const ENV_USER: &str = "LASTFM_USER";
const ENV_PERIOD: &str = "LASTFM_PERIOD";
const ENV_LIMIT: &str = "LASTFM_LIMIT";
const ENV_HISTORY_PATH: &str = "LISTENING_HISTORY_PATH";
const ENV_OUTPUT_DIR: &str = "SITE_OUTPUT_DIR";

/// Shape of the optional TOML file. Every key may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    user: Option<String>,
    period: Option<Period>,
    limit: Option<u32>,
    history_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    palette: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub user: Option<String>,
    pub period: Period,
    pub limit: u32,
    pub history_path: PathBuf,
    pub output_dir: PathBuf,
    /// Custom color tokens; `None` means the default palette.
    pub palette: Option<Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            user: None,
            period: Period::default(),
            limit: MAX_ARTISTS as u32,
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            palette: None,
        }
    }
}

impl AppConfig {
    /// Load the TOML file (if any) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => read_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                read_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => FileConfig::default(),
        };

        let mut config = Self::default().merge_file(file);
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults, without env overrides.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(content).context("Failed to parse config TOML")?;
        Ok(Self::default().merge_file(file))
    }

    fn merge_file(mut self, file: FileConfig) -> Self {
        if file.api_key.is_some() {
            self.api_key = file.api_key;
        }
        if file.user.is_some() {
            self.user = file.user;
        }
        if let Some(period) = file.period {
            self.period = period;
        }
        if let Some(limit) = file.limit {
            self.limit = limit;
        }
        if let Some(path) = file.history_path {
            self.history_path = path;
        }
        if let Some(dir) = file.output_dir {
            self.output_dir = dir;
        }
        if file.palette.is_some() {
            self.palette = file.palette;
        }
        self
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(user) = get(ENV_USER) {
            self.user = Some(user);
        }
        if let Some(period) = get(ENV_PERIOD) {
            self.period = period
                .parse()
                .with_context(|| format!("Invalid {ENV_PERIOD}"))?;
        }
        if let Some(limit) = get(ENV_LIMIT) {
            self.limit = limit
                .trim()
                .parse()
                .with_context(|| format!("Invalid {ENV_LIMIT} '{limit}'"))?;
        }
        if let Some(path) = get(ENV_HISTORY_PATH) {
            self.history_path = PathBuf::from(path);
        }
        if let Some(dir) = get(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// API key and user, both required for fetching.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        match (self.api_key.as_deref(), self.user.as_deref()) {
            (Some(key), Some(user)) => Ok((key, user)),
            _ => bail!("{ENV_API_KEY} and {ENV_USER} environment variables are required."),
        }
    }

    pub fn palette(&self) -> Result<Palette> {
        match &self.palette {
            Some(tokens) => Palette::new(tokens.iter().map(String::as_str))
                .context("Invalid palette in config"),
            None => Ok(Palette::default()),
        }
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}
