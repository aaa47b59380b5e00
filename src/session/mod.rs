//! Authentication stage: log in through the browser and carry the resulting
//! cookies around as a serializable [`SessionCredential`].
//!
//! Both post sources consume the same credential: the rendered source by
//! installing it into the browser, the direct-request source by turning one
//! named cookie into a `Cookie` header.

mod login;

pub use login::{export_credential, login, login_and_export, Credentials};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::{Result, SubsiftError};
use crate::pacing::DelayRange;

/// Name of the cookie that carries an authenticated session.
pub const SESSION_COOKIE: &str = "reddit_session";

/// One browser cookie, in the same JSON shape browser tooling exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Seconds since the epoch; `-1` for session cookies
    #[serde(default = "session_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

fn default_path() -> String {
    "/".to_string()
}

fn session_expiry() -> f64 {
    -1.0
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: default_path(),
            expires: session_expiry(),
            http_only: false,
            secure: false,
        }
    }
}

/// Opaque authenticated-session token: the cookie jar of a logged-in browser.
///
/// Serialized as a JSON array of cookie objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCredential {
    cookies: Vec<SessionCookie>,
}

impl SessionCredential {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self { cookies }
    }

    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    pub fn get(&self, name: &str) -> Option<&SessionCookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    /// The named cookie, which must be present with a non-empty value.
    ///
    /// A missing or blank cookie means the login did not take; callers must
    /// not fall back to unauthenticated requests.
    pub fn require(&self, name: &str) -> Result<&SessionCookie> {
        self.get(name)
            .filter(|c| !c.value.is_empty())
            .ok_or_else(|| SubsiftError::SessionCookieMissing(name.to_string()))
    }

    /// `Cookie` header value carrying only the named cookie.
    pub fn cookie_header(&self, name: &str) -> Result<String> {
        let cookie = self.require(name)?;
        Ok(format!("{}={}", cookie.name, cookie.value))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Login flow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub login_url: String,
    pub username_selector: String,
    pub password_selector: String,
    /// Visible label of the submit button
    pub login_button_label: String,
    /// Upper bound on waiting for the submit button to become enabled
    pub button_timeout_secs: u64,
    /// Pause after submitting, to absorb redirects and MFA prompts
    pub settle: DelayRange,
    pub cookie_name: String,
    pub session_file: PathBuf,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_url: "https://www.reddit.com/login".to_string(),
            username_selector: r#"input[name="username"]"#.to_string(),
            password_selector: r#"input[name="password"]"#.to_string(),
            login_button_label: "Log In".to_string(),
            button_timeout_secs: 15,
            settle: DelayRange::from_secs(3, 6),
            cookie_name: SESSION_COOKIE.to_string(),
            session_file: PathBuf::from("cookies.json"),
            username: None,
            password: None,
        }
    }
}
