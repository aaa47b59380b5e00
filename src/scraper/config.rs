use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the browser driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Navigation timeout in seconds, per page (default: 60)
    pub timeout_secs: u64,

    /// Upper bound on the network-quiescence wait in seconds (default: 20)
    pub network_idle_timeout_secs: u64,

    /// Extra wait after quiescence for client-side rendering in milliseconds (default: 1000)
    pub wait_after_load_ms: u64,

    /// User agent string to use
    pub user_agent: Option<String>,

    /// CSS selector matching post links on the feed page
    pub feed_link_selector: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: 60,
            network_idle_timeout_secs: 20,
            wait_after_load_ms: 1000,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            feed_link_selector: r#"a[slot="full-post-link"]"#.to_string(),
        }
    }
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

impl ScraperConfig {
    /// Get the navigation timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.network_idle_timeout_secs)
    }

    /// Get the wait time after load as a Duration
    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = ScraperConfig::default();
        assert!(config.headless);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.network_idle_timeout_secs, 20);
        assert_eq!(config.wait_after_load_ms, 1000);
        assert!(config.user_agent.is_some());
        assert_eq!(config.feed_link_selector, r#"a[slot="full-post-link"]"#);
    }

    #[test]
    fn test_durations() {
        let config = ScraperConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.network_idle_timeout(), Duration::from_secs(20));
        assert_eq!(config.wait_after_load(), Duration::from_millis(1000));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ScraperConfig = toml::from_str("headless = false").unwrap();
        assert!(!config.headless);
        assert_eq!(config.timeout_secs, 60);
    }
}
