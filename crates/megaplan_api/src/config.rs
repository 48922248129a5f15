//! Connection settings for the Megaplan API client.

use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "v3";
pub const DEFAULT_USER_AGENT: &str = "kubit-report";
pub const DEFAULT_PACING_MS: u64 = 1_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// How outbound read calls are throttled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// Sleep for the given duration after every successful read.
    FixedDelay(Duration),
    /// Enforce a minimum interval between the start of consecutive calls.
    Cooldown(Duration),
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::FixedDelay(Duration::from_millis(DEFAULT_PACING_MS))
    }
}

#[derive(Clone, Debug)]
pub struct MegaplanConfig {
    pub base_url: String,
    pub api_version: String,
    pub token: String,
    pub user_agent: String,
    pub pacing: Pacing,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl MegaplanConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            token: token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pacing: Pacing::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    /// Root of the versioned entity API, always ending with a slash.
    pub fn api_root(&self) -> String {
        format!(
            "{}/api/{}/",
            self.base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }

    /// Unversioned file upload endpoint.
    pub fn file_endpoint(&self) -> String {
        format!("{}/api/file", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::{MegaplanConfig, Pacing};
    use std::time::Duration;

    #[test]
    fn defaults_match_service_expectations() {
        let config = MegaplanConfig::new("https://example.megaplan.ru", "secret");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.pacing, Pacing::FixedDelay(Duration::from_secs(1)));
        assert_eq!(config.api_version, "v3");
    }

    #[test]
    fn api_root_normalizes_slashes() {
        let config = MegaplanConfig::new("https://example.megaplan.ru/", "secret")
            .with_api_version("/v3/");
        assert_eq!(config.api_root(), "https://example.megaplan.ru/api/v3/");
        assert_eq!(config.file_endpoint(), "https://example.megaplan.ru/api/file");
    }
}
