//! Settings file
//!
//! Settings live in `config.toml` under the platform config directory:
//! - Linux: `~/.config/fetchmd/config.toml`
//! - macOS: `~/Library/Application Support/fetchmd/config.toml`
//! - Windows: `%APPDATA%\fetchmd\config.toml`
//!
//! Every key is optional. A missing default file means default settings;
//! a file named explicitly with `--config` must exist.
//!
//! ```toml
//! indent = "dedent"
//! copy_command = "wl-copy"
//! notify_delay_ms = 1500
//!
//! [converter]
//! heading_style = "setext"
//! bullet_list_marker = "*"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::notifier::DEFAULT_BANNER_DELAY;
use crate::options::ConverterOptions;
use crate::postprocess::IndentPolicy;
use crate::source::DEFAULT_FETCH_TIMEOUT;

const APP_NAME: &str = "fetchmd";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub indent: IndentPolicy,
    /// How long the copy banner stays up
    pub notify_delay_ms: u64,
    /// Conversion time limit; unset means unbounded
    pub timeout_ms: Option<u64>,
    pub fetch_timeout_secs: u64,
    /// Fallback copy command line; unset means the platform default
    pub copy_command: Option<String>,
    pub converter: ConverterOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indent: IndentPolicy::default(),
            notify_delay_ms: DEFAULT_BANNER_DELAY.as_millis() as u64,
            timeout_ms: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            copy_command: None,
            converter: ConverterOptions::default(),
        }
    }
}

impl Settings {
    pub fn notify_delay(&self) -> Duration {
        Duration::from_millis(self.notify_delay_ms)
    }

    pub fn conversion_timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn from_toml(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// `<config dir>/fetchmd/config.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_NAME).join(CONFIG_FILE_NAME))
}

/// Load settings from `explicit`, or from the default location
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    match explicit {
        Some(path) => read_settings(path),
        None => match default_config_path() {
            Some(path) if path.exists() => read_settings(&path),
            Some(path) => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Settings::default())
            }
            None => {
                log::debug!("no config directory on this platform, using defaults");
                Ok(Settings::default())
            }
        },
    }
}

fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
    log::debug!("loading config from {}", path.display());

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    Settings::from_toml(&contents, path)
}
