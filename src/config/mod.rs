//! Configuration management for subsift.
//!
//! Configuration is read from `~/.config/subsift/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use crate::crawl::CrawlConfig;
use crate::fetcher::ApiConfig;
use crate::output::OutputConfig;
use crate::scraper::ScraperConfig;
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub browser: ScraperConfig,
    pub session: SessionConfig,
    pub output: OutputConfig,
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/subsift/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("subsift").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# subsift configuration
#
# Every key is optional; anything left out falls back to its default.
# Delay ranges are inline tables in milliseconds: { min_ms = 1000, max_ms = 3000 }
# Command-line flags take precedence over values in this file.

[crawl]
# Case-insensitive keywords; a post is kept if its title or body contains any
keywords = ["OpenAI", "GPT", "Learning"]

# Never open more than this many candidate posts
max_posts = 200

# Stop as soon as this many posts matched
min_posts = 100

# Scroll pulses per pass when the known links run out
scrolls = 5
scroll_px = 2500
scroll_settle = { min_ms = 800, max_ms = 1500 }

# Pause before opening each candidate
dispatch_settle = { min_ms = 1000, max_ms = 3000 }

# Skip candidates whose link text and URL contain no keyword, without opening them
prefilter_links = false

# "flat": replies one level deep; "threaded": the full reply tree
comments = "flat"

[browser]
# Run browser in headless mode (no visible window)
headless = true

# Page load timeout in seconds
timeout_secs = 60

# Upper bound on waiting for network quiescence, in seconds
network_idle_timeout_secs = 20

# Wait time after page load for dynamic content (milliseconds)
wait_after_load_ms = 1000

# CSS selector of post links on the feed page
feed_link_selector = 'a[slot="full-post-link"]'

[session]
login_url = "https://www.reddit.com/login"
cookie_name = "reddit_session"
session_file = "cookies.json"
# username = "..."
# password = "..."   # prefer the SUBSIFT_PASSWORD environment variable

[output]
csv_path = "reddit_posts_and_first_comments.csv"
json_dir = "data"

[api]
origin = "https://www.reddit.com"
timeout_secs = 30
max_attempts = 3
# "uniform": { kind = "uniform", min_ms, max_ms }
# "exponential": { kind = "exponential", base_ms, factor, max_ms, jitter }
backoff = { kind = "uniform", min_ms = 2000, max_ms = 5000 }
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
