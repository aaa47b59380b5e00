use std::path::Path;

use crate::app::error::{Result, SubsiftError};
use crate::config::Config;
use crate::session::{Credentials, SessionCredential};

/// Resolved configuration shared by every command.
pub struct AppContext {
    pub config: Config,
}

impl AppContext {
    /// Load the configuration file (`None` for the default location).
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path).map_err(|e| SubsiftError::Config(e.to_string()))?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Login credentials, preferring explicit values over the config file.
    pub fn credentials(&self, username: Option<&str>, password: Option<&str>) -> Result<Credentials> {
        let session = &self.config.session;
        let username = username
            .or(session.username.as_deref())
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                SubsiftError::Config("No username given (use --username or SUBSIFT_USERNAME)".into())
            })?;
        let password = password
            .or(session.password.as_deref())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| SubsiftError::Config("No password given (set SUBSIFT_PASSWORD)".into()))?;
        Ok(Credentials::new(username, password))
    }

    /// The saved session, if the session file exists.
    pub fn saved_credential(&self, session_file: &Path) -> Result<Option<SessionCredential>> {
        if !session_file.exists() {
            return Ok(None);
        }
        SessionCredential::load(session_file).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionCookie;
    use tempfile::TempDir;

    #[test]
    fn test_credentials_prefer_explicit_values() {
        let mut config = Config::default();
        config.session.username = Some("from_file".into());
        config.session.password = Some("file_pw".into());
        let ctx = AppContext::with_config(config);

        let creds = ctx.credentials(Some("from_cli"), None).unwrap();
        assert_eq!(creds.username, "from_cli");
        assert_eq!(creds.password, "file_pw");
    }

    #[test]
    fn test_missing_credentials() {
        let ctx = AppContext::with_config(Config::default());
        assert!(matches!(ctx.credentials(None, Some("pw")), Err(SubsiftError::Config(_))));
        assert!(matches!(ctx.credentials(Some("me"), None), Err(SubsiftError::Config(_))));
        assert!(ctx.credentials(Some("  "), Some("pw")).is_err());
    }

    #[test]
    fn test_saved_credential() {
        let dir = TempDir::new().unwrap();
        let ctx = AppContext::with_config(Config::default());
        let path = dir.path().join("cookies.json");
        assert!(ctx.saved_credential(&path).unwrap().is_none());

        let credential = SessionCredential::new(vec![SessionCookie::new("reddit_session", "tok")]);
        credential.save(&path).unwrap();
        assert_eq!(ctx.saved_credential(&path).unwrap(), Some(credential));
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[crawl]\nmax_posts = 7\n").unwrap();

        let ctx = AppContext::load(Some(&path)).unwrap();
        assert_eq!(ctx.config.crawl.max_posts, 7);
    }
}
