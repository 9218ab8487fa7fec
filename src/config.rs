//! Layered configuration: defaults, global TOML file, project overrides,
//! environment and command line.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// What happened to the global config file at start-up.
#[derive(Debug, Clone)]
pub enum ConfigLoadStatus {
    Loaded,
    /// First run: defaults were written.
    Created,
    /// Defaults in use; the message is logged and shown in the header.
    Error(String),
}

impl ConfigLoadStatus {
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ConfigLoadStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    /// Request timeout. Code generation can take minutes, so this is generous.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Where downloaded projects and saved code blocks go
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    pub directory: String,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            directory: "~/Downloads".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Color scheme of the terminal UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

/// UI behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: Theme,
    /// How long the upload success panel stays up before moving to snippets.
    pub redirect_delay_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            redirect_delay_ms: 1500,
        }
    }
}

/// Generation result presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Heading in the raw model answer where the instructions section starts.
    /// Matched case-insensitively.
    pub instructions_marker: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            instructions_marker: "### estrutura do projeto".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl Config {
    /// Expand `~` to home directory in a path string
    pub fn expand_tilde(path: &str) -> PathBuf {
        if let Some(stripped) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(stripped);
        }
        PathBuf::from(path)
    }

    /// Get the expanded download directory
    pub fn download_dir(&self) -> PathBuf {
        Self::expand_tilde(&self.downloads.directory)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.ui.redirect_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialServerConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialDownloadsConfig {
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialLoggingConfig {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialUiConfig {
    pub theme: Option<Theme>,
    pub redirect_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialGenerationConfig {
    pub instructions_marker: Option<String>,
}

/// Project-specific configuration where every field is optional.
/// Parsed from `.promptcodegen` files. Fields that are `None` inherit from the global config.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PartialConfig {
    pub server: PartialServerConfig,
    pub downloads: PartialDownloadsConfig,
    pub logging: PartialLoggingConfig,
    pub ui: PartialUiConfig,
    pub generation: PartialGenerationConfig,
}

/// Merge a global config with a project-level partial config.
/// Project values override global values where present.
pub fn merge_config(global: &Config, project: &PartialConfig) -> Config {
    Config {
        server: ServerConfig {
            base_url: project
                .server
                .base_url
                .clone()
                .unwrap_or_else(|| global.server.base_url.clone()),
            timeout_secs: project
                .server
                .timeout_secs
                .unwrap_or(global.server.timeout_secs),
        },
        downloads: DownloadsConfig {
            directory: project
                .downloads
                .directory
                .clone()
                .unwrap_or_else(|| global.downloads.directory.clone()),
        },
        logging: LoggingConfig {
            level: project
                .logging
                .level
                .clone()
                .unwrap_or_else(|| global.logging.level.clone()),
        },
        ui: UiConfig {
            theme: project.ui.theme.unwrap_or(global.ui.theme),
            redirect_delay_ms: project
                .ui
                .redirect_delay_ms
                .unwrap_or(global.ui.redirect_delay_ms),
        },
        generation: GenerationConfig {
            instructions_marker: project
                .generation
                .instructions_marker
                .clone()
                .unwrap_or_else(|| global.generation.instructions_marker.clone()),
        },
    }
}

/// Errors reading or writing a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid TOML in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Configuration in effect plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// Global file; the theme toggle writes here.
    pub config_path: PathBuf,
    pub project_config_path: Option<PathBuf>,
    pub status: ConfigLoadStatus,
}

/// `config.toml` under the platform config directory.
pub fn get_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "promptcodegen", "promptcodegen")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// `.promptcodegen` in the working directory, when present.
pub fn get_project_config_path() -> Option<PathBuf> {
    let path = env::current_dir().ok()?.join(".promptcodegen");
    path.is_file().then_some(path)
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Layer defaults, the global file, the project file and the environment.
///
/// Never fails: problems are logged and reported through `status`.
pub fn load_config() -> LoadedConfig {
    let Some(config_path) = get_config_path() else {
        warn!("config_dir_unavailable");
        return LoadedConfig {
            config: apply_env_overrides(Config::default()),
            config_path: PathBuf::from("config.toml"),
            project_config_path: None,
            status: ConfigLoadStatus::Error("Could not determine config directory".to_string()),
        };
    };
    debug!(path = ?config_path, "config_path_resolved");

    let (mut config, status) = load_or_create_config(&config_path);

    let project_config_path = get_project_config_path();
    if let Some(project_path) = &project_config_path {
        match read_toml::<PartialConfig>(project_path) {
            Ok(partial) => {
                config = merge_config(&config, &partial);
                info!(path = ?project_path, "project_config_loaded");
            }
            Err(e) => warn!(error = %e, "project_config_ignored"),
        }
    }

    LoadedConfig {
        config: apply_env_overrides(config),
        config_path,
        project_config_path,
        status,
    }
}

/// Persist the theme choice into the global config file.
///
/// Only the theme is touched: the file is re-read so project overrides and
/// env/CLI overrides active in this session do not leak into it.
pub fn save_theme(theme: Theme, config_path: &Path) -> Result<(), ConfigError> {
    let mut on_disk = match read_toml::<Config>(config_path) {
        Ok(config) => config,
        Err(e) if e.is_not_found() => Config::default(),
        Err(e) => return Err(e),
    };
    on_disk.ui.theme = theme;
    save_config(&on_disk, config_path)
}

/// Write `config` to `config_path`, creating parent directories.
pub fn save_config(config: &Config, config_path: &Path) -> Result<(), ConfigError> {
    let toml_content = toml::to_string_pretty(config)?;

    if let Some(parent) = config_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(config_path, toml_content).map_err(|source| ConfigError::Write {
        path: config_path.to_path_buf(),
        source,
    })?;

    info!(path = ?config_path, "config_saved");
    Ok(())
}

/// Read the global file, writing defaults on first run.
fn load_or_create_config(config_path: &Path) -> (Config, ConfigLoadStatus) {
    match read_toml::<Config>(config_path) {
        Ok(config) => {
            info!(path = ?config_path, "config_file_loaded");
            (config, ConfigLoadStatus::Loaded)
        }
        Err(e) if e.is_not_found() => {
            let config = Config::default();
            match save_config(&config, config_path) {
                Ok(()) => {
                    info!(path = ?config_path, "default_config_created");
                    (config, ConfigLoadStatus::Created)
                }
                Err(e) => {
                    warn!(error = %e, "default_config_write_failed");
                    (config, ConfigLoadStatus::Error(e.to_string()))
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "config_file_unusable");
            (Config::default(), ConfigLoadStatus::Error(e.to_string()))
        }
    }
}

/// Apply environment variable overrides to config
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(url) = env::var("PROMPTCODEGEN_API_URL") {
        debug!("Overriding server.base_url from PROMPTCODEGEN_API_URL");
        config.server.base_url = url;
    }

    if let Ok(dir) = env::var("PROMPTCODEGEN_DOWNLOAD_DIR") {
        debug!("Overriding downloads.directory from PROMPTCODEGEN_DOWNLOAD_DIR");
        config.downloads.directory = dir;
    }

    if let Ok(level) = env::var("PROMPTCODEGEN_LOG") {
        debug!("Overriding logging.level from PROMPTCODEGEN_LOG");
        config.logging.level = level;
    }

    config
}
