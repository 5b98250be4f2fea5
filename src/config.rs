use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdaterError};
use crate::install::{MAX_RETRY_DELAY_MS, RetryPolicy};

pub const DEFAULT_VERSION_URL: &str =
    "https://googlechromelabs.github.io/chrome-for-testing/LATEST_RELEASE_STABLE";
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://storage.googleapis.com/chrome-for-testing-public";

/// Overrides `request_timeout_secs` (seconds)
pub const ENV_TIMEOUT: &str = "CFT_UPDATER_TIMEOUT";
pub const ENV_VERSION_URL: &str = "CFT_UPDATER_VERSION_URL";
pub const ENV_DOWNLOAD_BASE: &str = "CFT_UPDATER_DOWNLOAD_BASE";

/// Updater configuration, read from `config.toml`.
///
/// Every key is optional; missing keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Plain-text endpoint whose first line is the latest stable version
    pub version_url: String,
    /// Archives live at `<download_base>/<version>/<platform>/<stem>.zip`
    pub download_base: String,
    /// Whole-request timeout, covering the archive body
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Retries after the first attempt for idempotent GETs
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry
    pub retry_base_delay_ms: u64,
    pub user_agent: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            version_url: DEFAULT_VERSION_URL.into(),
            download_base: DEFAULT_DOWNLOAD_BASE.into(),
            request_timeout_secs: 300,
            connect_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 500,
            user_agent: concat!("cft-updater/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl UpdaterConfig {
    /// `<config dir>/cft-updater/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cft-updater").join("config.toml"))
    }

    /// Load configuration the way the CLI does.
    ///
    /// An explicit path must exist. Without one, the default location is used
    /// when present and built-in defaults otherwise. Environment overrides are
    /// applied last, then the result is validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => {
                    log::debug!("Using config from: {}", path.display());
                    Self::from_file(&path)?
                }
                _ => Self::default(),
            },
        };

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            UpdaterError::config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&text).map_err(|e| {
            UpdaterError::config(format!("{} ({})", e, path.display()))
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| UpdaterError::config(format!("Failed to parse config: {e}")))
    }

    /// Apply `CFT_UPDATER_*` environment variables.
    ///
    /// An unparsable timeout is ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(ENV_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => log::warn!("Ignoring {ENV_TIMEOUT}={raw}: not a number of seconds"),
            }
        }
        if let Ok(url) = std::env::var(ENV_VERSION_URL) {
            self.version_url = url;
        }
        if let Ok(base) = std::env::var(ENV_DOWNLOAD_BASE) {
            self.download_base = base;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("version_url", &self.version_url),
            ("download_base", &self.download_base),
        ] {
            let parsed = url::Url::parse(value)
                .map_err(|e| UpdaterError::config(format!("{key} '{value}' is not a valid URL: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(UpdaterError::config(format!(
                    "{key} must be an http(s) URL, got '{value}'"
                )));
            }
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(UpdaterError::config("timeouts must be at least one second"));
        }
        if self.retry_base_delay_ms > MAX_RETRY_DELAY_MS {
            return Err(UpdaterError::config(format!(
                "retry_base_delay_ms must not exceed {MAX_RETRY_DELAY_MS}, got {}",
                self.retry_base_delay_ms
            )));
        }
        Ok(())
    }

    /// Download base without a trailing slash
    pub fn download_base(&self) -> &str {
        self.download_base.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.saturating_add(1),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}
