//! Client configuration.
//!
//! Endpoint routes are fixed by the remote service. The base URL and the
//! request timeout come from the environment (a `.env` file is honoured).

use std::env;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Base URL of the drafting service when `LEADMAIL_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Draft endpoint: spreadsheet in, lead/email pairs out.
pub const DRAFT_PATH: &str = "/api/services/email-draft/";

/// Refactor endpoint: email + instruction in, rewritten email out.
pub const REFACTOR_PATH: &str = "/api/services/email-refactor/";

/// Send endpoint: final email in, delivery confirmation out.
pub const SEND_PATH: &str = "/api/services/send-email/";

/// Content type attached to the uploaded spreadsheet.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Extension accepted by the upload commands.
pub const XLSX_EXTENSION: &str = "xlsx";

/// Per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Port used by `leadmail mock-serve`.
pub const DEFAULT_MOCK_PORT: u16 = 8000;

/// Capacity of the log broadcast channel. Slow subscribers miss older entries.
pub const MAX_LOG_ENTRIES: usize = 100;

const ENV_API_URL: &str = "LEADMAIL_API_URL";
const ENV_TIMEOUT: &str = "LEADMAIL_TIMEOUT_SECS";

/// Where the collaborator services live and how long to wait for them.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL without trailing slash, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

impl ClientConfig {
    /// Load from `LEADMAIL_API_URL` / `LEADMAIL_TIMEOUT_SECS`.
    ///
    /// A timeout of `0` disables it.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        if let Ok(url) = env::var(ENV_API_URL) {
            config = config.with_base_url(&url)?;
        }
        if let Ok(raw) = env::var(ENV_TIMEOUT) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: ENV_TIMEOUT,
                value: raw.clone(),
            })?;
            config = config.with_timeout(secs);
        }
        Ok(config)
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: &str) -> ConfigResult<Self> {
        let trimmed = url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        }
        self.base_url = trimmed.to_string();
        Ok(self)
    }

    /// Set the timeout in seconds, `0` for none.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    /// Full URL of an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
