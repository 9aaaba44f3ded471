use dirs::Dirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the settings file inside the grip home directory.
pub const SETTINGS_FILE: &str = "settings.toml";

pub struct LoadedConfig {
    pub config: Config,
    pub file_path: PathBuf,
    /// Whether `file_path` could be read.
    pub file_found: bool,
    pub maybe_error: Option<toml::de::Error>,
}

/// Loads the config from `specified_config_file`, or `<grip home>/settings.toml`.
///
/// A missing or malformed file yields the defaults, along with `file_found`
/// and the parse error so that the caller can report them once logging is up.
pub fn load_config(specified_config_file: Option<PathBuf>) -> LoadedConfig {
    let config_file =
        specified_config_file.unwrap_or_else(|| Dirs::grip_home().join(SETTINGS_FILE));
    load_config_from(&config_file)
}

fn load_config_from(config_file: &Path) -> LoadedConfig {
    let mut maybe_error = None;
    let mut file_found = false;

    let config = match std::fs::read_to_string(config_file) {
        Ok(contents) => {
            file_found = true;
            match toml::from_str(&contents) {
                Ok(config) => config,
                Err(err) => {
                    maybe_error.replace(err);
                    Config::default()
                }
            }
        }
        Err(_) => Config::default(),
    };

    LoadedConfig {
        config,
        file_path: config_file.to_path_buf(),
        file_found,
        maybe_error,
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LogConfig {
    /// Specify the log file path.
    ///
    /// This path must be an absolute path.
    pub log_file: Option<String>,

    /// Specify the max log level.
    pub max_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            max_level: "info".into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Host the server listens on.
    pub host: String,

    /// Port the server listens on.
    pub port: u16,

    /// Print full error traces instead of one-line summaries.
    pub debug: bool,

    /// Cache directory name relative to the grip home, `{version}` is
    /// substituted with the running version.
    ///
    /// Set it to an empty string to disable the asset cache.
    pub cache_directory: String,

    /// Refresh the page automatically when the README changes.
    pub autorefresh: bool,

    /// Do not print to the terminal.
    pub quiet: bool,

    /// GitHub username used for API authentication.
    pub username: Option<String>,

    /// GitHub password or personal access token.
    ///
    /// Prefer a personal access token over the account password.
    pub password: Option<String>,

    /// Base URL of the GitHub API, e.g. that of a GitHub Enterprise instance.
    pub api_url: Option<String>,

    /// Stylesheets always included in the rendered page.
    pub style_urls: Vec<String>,

    /// Log config.
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6419,
            debug: false,
            cache_directory: "cache-{version}".into(),
            autorefresh: true,
            quiet: false,
            username: None,
            password: None,
            api_url: None,
            style_urls: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Absolute cache directory for the given version, `None` if caching is disabled.
    pub fn cache_path(&self, version: &str) -> Option<PathBuf> {
        if self.cache_directory.is_empty() {
            return None;
        }
        Some(Dirs::default_cache_dir(&self.cache_directory, version))
    }
}
