//! Client configuration.
//!
//! Settings are layered, later sources winning:
//! 1. built-in defaults
//! 2. an optional TOML file (`photox.toml` in the working directory unless
//!    another path is given)
//! 3. `PHOTOX_*` environment variables, e.g. `PHOTOX_BASE_URL`

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat, FileSourceFile};
use photox_domain::AuthEndpoints;
use photox_domain::auth::{LOGIN_PATH, REFRESH_PATH};
use serde::Deserialize;
use thiserror::Error;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";
/// Default request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "photox.toml";
/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "PHOTOX";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or a value has the wrong type.
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    /// A value was read but is not usable.
    #[error("invalid setting `{key}`: {message}")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Settings for the API client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    /// API root that relative request paths are appended to.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Where the session tokens are persisted.
    pub session_file: PathBuf,
    /// Login endpoint path.
    pub login_path: String,
    /// Token refresh endpoint path.
    pub refresh_path: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: format!("photox/{}", env!("CARGO_PKG_VERSION")),
            session_file: default_session_file(),
            login_path: LOGIN_PATH.to_string(),
            refresh_path: REFRESH_PATH.to_string(),
        }
    }
}

/// `<config dir>/photox/session.json`, or `./photox/session.json` when the
/// platform has no config directory.
#[must_use]
pub fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photox")
        .join("session.json")
}

impl ClientSettings {
    /// Loads settings from the defaults, `photox.toml` if present, and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source is malformed or a value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Like [`load`](Self::load) but reads `path` instead of `photox.toml`.
    /// An explicit path must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a source is malformed or a value is invalid.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };
        Self::build(file, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn build(
        file: File<FileSourceFile, FileFormat>,
        env: Environment,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings: Self = Config::builder()
            .set_default("base_url", defaults.base_url)?
            .set_default("timeout_ms", defaults.timeout_ms)?
            .set_default("user_agent", defaults.user_agent)?
            .set_default(
                "session_file",
                defaults.session_file.to_string_lossy().to_string(),
            )?
            .set_default("login_path", defaults.login_path)?
            .set_default("refresh_path", defaults.refresh_path)?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url).map_err(|e| ConfigError::Invalid {
            key: "base_url",
            message: e.to_string(),
        })?;
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        let paths = [
            ("login_path", &self.login_path),
            ("refresh_path", &self.refresh_path),
        ];
        for (key, path) in paths {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    key,
                    message: format!("must start with '/': {path}"),
                });
            }
        }
        Ok(())
    }

    /// Login and refresh paths for the client core.
    #[must_use]
    pub fn endpoints(&self) -> AuthEndpoints {
        AuthEndpoints {
            login: self.login_path.clone(),
            refresh: self.refresh_path.clone(),
        }
    }
}
