use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use ytdl_monitor::YoutubeDlConfig;

use crate::cli::Args;
use crate::error::{AppError, Result};

/// Settings read from the TOML configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub downloader: YoutubeDlConfig,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl AppConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Ok(Self::default());
        };

        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|source| AppError::Config { path, source })
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ytdl").join("config.toml"))
    }

    /// Apply command-line overrides.
    pub fn merge_args(mut self, args: &Args) -> Self {
        if let Some(binary) = &args.binary {
            self.downloader.binary_path = binary.clone();
        }
        if args.username.is_some() {
            self.username = args.username.clone();
        }
        if args.password.is_some() {
            self.password = args.password.clone();
        }
        self
    }
}
