//! Direct-request post extraction over the site's JSON endpoint.

pub mod http_fetcher;
pub mod retry;

pub use http_fetcher::{post_id_from_url, ApiPostSource};
pub use retry::{Backoff, RetryOutcome, RetryPolicy};

use serde::{Deserialize, Serialize};

use crate::pacing::DelayRange;
use crate::scraper::{DEFAULT_USER_AGENT, SITE_ORIGIN};

/// Settings for the direct-request client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Origin the `/comments/<id>.json` endpoint is served from
    pub origin: String,
    /// Per-request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Attempts per post before giving up on it (default: 3)
    pub max_attempts: u32,
    /// Wait between attempts (default: uniform 2-5s)
    pub backoff: Backoff,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            origin: SITE_ORIGIN.to_string(),
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_attempts: 3,
            backoff: Backoff::Uniform(DelayRange::from_secs(2, 5)),
        }
    }
}

impl ApiConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.backoff.clone())
    }
}
