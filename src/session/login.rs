use std::fmt;
use std::time::Duration;

use chromiumoxide::Page;
use tracing::{info, warn};

use crate::app::{Result, SubsiftError};
use crate::scraper::ChromeSession;
use crate::session::{SessionConfig, SessionCredential};

/// Username and password for the interactive login form
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Log in on the session's primary page.
///
/// Afterwards the browsing context carries the session cookies and can be
/// used for the crawl directly.
pub async fn login(
    session: &ChromeSession,
    credentials: &Credentials,
    settings: &SessionConfig,
) -> Result<()> {
    let page = session.primary_page().await?;
    session.navigate(&page, &settings.login_url).await?;

    fill(&page, &settings.username_selector, &credentials.username).await?;
    fill(&page, &settings.password_selector, &credentials.password).await?;

    let timeout = Duration::from_secs(settings.button_timeout_secs);
    let clicked = click_when_enabled(&page, &settings.login_button_label, timeout).await?;
    if !clicked {
        return Err(SubsiftError::Browser(format!(
            "Login button '{}' did not become enabled within {:?}",
            settings.login_button_label, timeout
        )));
    }

    session.settle(&page).await;
    settings.settle.pause().await;

    info!("Submitted login for {}", credentials.username);
    Ok(())
}

/// Read the browser's cookies, requiring the configured session cookie.
pub async fn export_credential(
    session: &ChromeSession,
    settings: &SessionConfig,
) -> Result<SessionCredential> {
    let credential = session.export_credential().await?;
    accept_exported(credential, settings)
}

fn accept_exported(
    credential: SessionCredential,
    settings: &SessionConfig,
) -> Result<SessionCredential> {
    if let Err(e) = credential.require(&settings.cookie_name) {
        warn!(
            "Login finished without a usable '{}' cookie ({} cookies present)",
            settings.cookie_name,
            credential.cookies().len()
        );
        return Err(e);
    }
    Ok(credential)
}

/// Standalone flow: log in, export cookies, and persist them to the session file.
pub async fn login_and_export(
    session: &ChromeSession,
    credentials: &Credentials,
    settings: &SessionConfig,
) -> Result<SessionCredential> {
    login(session, credentials, settings).await?;
    let credential = export_credential(session, settings).await?;
    credential.save(&settings.session_file)?;
    info!(
        "Saved {} cookies to {}",
        credential.cookies().len(),
        settings.session_file.display()
    );
    Ok(credential)
}

async fn fill(page: &Page, selector: &str, value: &str) -> Result<()> {
    page.find_element(selector)
        .await
        .map_err(|e| SubsiftError::browser(&format!("Login field {} not found", selector), e))?
        .click()
        .await
        .map_err(|e| SubsiftError::browser("Failed to focus login field", e))?
        .type_str(value)
        .await
        .map_err(|e| SubsiftError::browser("Failed to type into login field", e))?;
    Ok(())
}

/// Wait in-page for a button labelled `label` to be enabled, then click it.
///
/// The wait is a single promise driven by a MutationObserver and bounded by
/// `timeout`; returns false if the button never became clickable.
async fn click_when_enabled(page: &Page, label: &str, timeout: Duration) -> Result<bool> {
    let script = button_wait_script(label, timeout);
    let clicked = page
        .evaluate(script)
        .await
        .map_err(|e| SubsiftError::browser("Login button wait failed", e))?
        .into_value::<bool>()
        .unwrap_or(false);
    Ok(clicked)
}

pub(crate) fn button_wait_script(label: &str, timeout: Duration) -> String {
    let label = serde_json::Value::String(label.to_string()).to_string();
    let timeout_ms = timeout.as_millis();
    format!(
        r#"new Promise((resolve) => {{
            const label = {label};
            const findButton = () => {{
                const roots = [document];
                while (roots.length) {{
                    const root = roots.pop();
                    for (const el of root.querySelectorAll('*')) {{
                        if (el.shadowRoot) roots.push(el.shadowRoot);
                        const isButton = el.tagName === 'BUTTON' || el.getAttribute('role') === 'button';
                        if (isButton && (el.innerText || el.textContent || '').trim() === label) return el;
                    }}
                }}
                return null;
            }};
            const tryClick = () => {{
                const button = findButton();
                if (button && !button.disabled && button.getAttribute('aria-disabled') !== 'true') {{
                    button.click();
                    return true;
                }}
                return false;
            }};
            if (tryClick()) {{ resolve(true); return; }}
            const observer = new MutationObserver(() => {{
                if (tryClick()) {{ observer.disconnect(); resolve(true); }}
            }});
            observer.observe(document, {{ subtree: true, childList: true, attributes: true }});
            setTimeout(() => {{ observer.disconnect(); resolve(tryClick()); }}, {timeout_ms});
        }})"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionCookie;

    #[test]
    fn test_export_rejects_blank_session_cookie() {
        let settings = SessionConfig::default();
        let blank = SessionCredential::new(vec![
            SessionCookie::new("csrf_token", "x"),
            SessionCookie::new(settings.cookie_name.as_str(), ""),
        ]);
        assert!(matches!(
            accept_exported(blank, &settings),
            Err(SubsiftError::SessionCookieMissing(name)) if name == settings.cookie_name
        ));

        let absent = SessionCredential::new(vec![SessionCookie::new("csrf_token", "x")]);
        assert!(accept_exported(absent, &settings).is_err());

        let good = SessionCredential::new(vec![SessionCookie::new(
            settings.cookie_name.as_str(),
            "tok",
        )]);
        let accepted = accept_exported(good, &settings).unwrap();
        assert_eq!(accepted.cookies().len(), 1);
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("alice", "hunter2");
        let shown = format!("{:?}", creds);
        assert!(shown.contains("alice"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_button_wait_script_embeds_label_and_timeout() {
        let script = button_wait_script("Log In", Duration::from_secs(15));
        assert!(script.contains(r#"const label = "Log In";"#));
        assert!(script.contains("15000"));
        assert!(script.contains("MutationObserver"));
    }

    #[test]
    fn test_button_wait_script_escapes_label() {
        let script = button_wait_script(r#"Say "hi"</script>"#, Duration::from_millis(10));
        assert!(script.contains(r#"const label = "Say \"hi\"</script>";"#));
    }
}
