use std::env;
use std::time::Duration;

use tracing::warn;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000/api/";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Where the REST backend lives and how long to wait for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Build a config for `base_url`, normalized to end with a slash.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(base_url.trim())?;
        let mut base_url = parsed.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Read `AULA_API_URL` and `AULA_API_TIMEOUT_SECS`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = env::var("AULA_API_URL")
            .ok()
            .and_then(|raw| match Self::new(&raw) {
                Ok(config) => Some(config),
                Err(err) => {
                    warn!(url = %raw, error = %err, "ignoring invalid AULA_API_URL");
                    None
                }
            })
            .unwrap_or_default();
        if let Some(secs) = env_u64("AULA_API_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Timing knobs of an evaluation session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Period of the remaining-time synchronization with the backend.
    pub sync_interval: Duration,
    /// Idle window after the last answer edit before it is saved remotely.
    pub save_debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(30),
            save_debounce: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    /// Read `AULA_SYNC_INTERVAL_SECS` and `AULA_SAVE_DEBOUNCE_MS` over the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env_u64("AULA_SYNC_INTERVAL_SECS").filter(|secs| *secs > 0) {
            config.sync_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = env_u64("AULA_SAVE_DEBOUNCE_MS") {
            config.save_debounce = Duration::from_millis(ms);
        }
        config
    }

    #[must_use]
    pub fn with_sync_interval(mut self, sync_interval: Duration) -> Self {
        self.sync_interval = sync_interval;
        self
    }

    #[must_use]
    pub fn with_save_debounce(mut self, save_debounce: Duration) -> Self {
        self.save_debounce = save_debounce;
        self
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(name, value = %raw, error = %err, "ignoring invalid numeric setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = ApiConfig::new("https://backend.example.com/api").unwrap();
        assert_eq!(config.base_url(), "https://backend.example.com/api/");
    }

    #[test]
    fn relative_base_url_is_rejected() {
        assert!(ApiConfig::new("api/").is_err());
    }

    #[test]
    fn default_session_timings() {
        let config = SessionConfig::default();
        assert_eq!(config.sync_interval, Duration::from_secs(30));
        assert_eq!(config.save_debounce, Duration::from_secs(1));
    }
}
