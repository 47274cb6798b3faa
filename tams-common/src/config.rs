//! Configuration loading and resolution
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file at the default location is not an error: a warning is
//! logged and the compiled defaults are used. A TOML file named explicitly
//! (CLI or `TAMS_CONFIG`) must exist and parse.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ENV_CONFIG_PATH: &str = "TAMS_CONFIG";
pub const ENV_BACKEND_URL: &str = "TAMS_BACKEND_URL";
pub const ENV_ACCESS_TOKEN: &str = "TAMS_ACCESS_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "TAMS_REFRESH_TOKEN";
pub const ENV_LOG_LEVEL: &str = "TAMS_LOG_LEVEL";

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackendConfig {
    /// REST API root, e.g. `https://tams.example.edu/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout enforced by the transport
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Bearer credentials
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("TAMS/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    /// TOML file the configuration was read from, if any
    pub source_path: Option<PathBuf>,
}

/// Resolves configuration from CLI, environment, TOML file and defaults
pub struct ConfigResolver {
    overrides: ConfigOverrides,
}

impl ConfigResolver {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self { overrides }
    }

    /// Resolve the complete configuration
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let (toml_config, source_path) = match self.config_file()? {
            Some(path) => {
                let config = load_toml_config(&path)?;
                info!("Loaded TOML configuration from {}", path.display());
                (config, Some(path))
            }
            None => {
                warn!("No config file found, using compiled defaults");
                (TomlConfig::default(), None)
            }
        };

        let base_url = pick(
            self.overrides.backend_url.clone(),
            ENV_BACKEND_URL,
            Some(toml_config.backend.base_url.clone()),
        )
        .unwrap_or_else(default_base_url);

        let backend = BackendConfig {
            base_url: normalize_base_url(&base_url)?,
            timeout_secs: toml_config.backend.timeout_secs,
            user_agent: toml_config.backend.user_agent.clone(),
        };

        if backend.timeout_secs == 0 {
            return Err(Error::Config("backend.timeout_secs must be positive".to_string()));
        }

        let auth = AuthConfig {
            access_token: pick(
                self.overrides.access_token.clone(),
                ENV_ACCESS_TOKEN,
                toml_config.auth.access_token.clone(),
            ),
            refresh_token: pick(
                self.overrides.refresh_token.clone(),
                ENV_REFRESH_TOKEN,
                toml_config.auth.refresh_token.clone(),
            ),
        };

        let logging = LoggingConfig {
            level: pick(
                self.overrides.log_level.clone(),
                ENV_LOG_LEVEL,
                Some(toml_config.logging.level.clone()),
            )
            .unwrap_or_else(default_log_level),
        };

        Ok(ResolvedConfig {
            backend,
            auth,
            logging,
            source_path,
        })
    }

    /// Locate the TOML file to read
    ///
    /// An explicitly named file must exist; the platform default is optional.
    fn config_file(&self) -> Result<Option<PathBuf>> {
        let explicit = self
            .overrides
            .config_path
            .clone()
            .or_else(|| non_empty_env(ENV_CONFIG_PATH).map(PathBuf::from));

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Some(path));
        }

        Ok(default_config_path())
    }
}

/// First non-empty value of CLI argument, environment variable, TOML value
fn pick(cli: Option<String>, env_var: &str, toml_value: Option<String>) -> Option<String> {
    cli.filter(|v| !v.trim().is_empty())
        .or_else(|| non_empty_env(env_var))
        .or_else(|| toml_value.filter(|v| !v.trim().is_empty()))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Validate the scheme and strip trailing slashes
pub fn normalize_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "backend.base_url must start with http:// or https://, got {:?}",
            url
        )));
    }
    Ok(trimmed.to_string())
}

/// Default configuration file for the platform, if one exists
///
/// `~/.config/tams/config.toml` first, then `/etc/tams/config.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("tams").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/tams/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read and parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    Ok(toml::from_str(&content)?)
}

/// Write a TOML configuration file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
