use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::app::{Result, SubsiftError};
use crate::scraper::config::ScraperConfig;
use crate::scraper::extractor::parse_feed_links;
use crate::scraper::{FeedDriver, FeedLink, PageRenderer, RenderedPage};
use crate::session::{SessionCookie, SessionCredential};

/// One Chrome instance: a long-lived primary page for the feed (and login),
/// plus a short-lived page per rendered candidate.
pub struct ChromeSession {
    browser: Mutex<Browser>,
    primary: Mutex<Option<Page>>,
    handler: JoinHandle<()>,
    config: ScraperConfig,
}

impl ChromeSession {
    /// Launch a browser with the given configuration
    pub async fn launch(config: ScraperConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(config.timeout())
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer");

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| SubsiftError::browser("Failed to build browser config", e))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            SubsiftError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            primary: Mutex::new(None),
            handler,
            config,
        })
    }

    /// The primary page, created on first use
    pub async fn primary_page(&self) -> Result<Page> {
        let mut primary = self.primary.lock().await;
        if let Some(page) = primary.as_ref() {
            return Ok(page.clone());
        }
        let page = self.blank_page().await?;
        *primary = Some(page.clone());
        Ok(page)
    }

    /// Navigate `page` to `url`, bounded by the navigation timeout, then let it settle
    pub async fn navigate(&self, page: &Page, url: &str) -> Result<()> {
        tokio::time::timeout(self.config.timeout(), page.goto(url))
            .await
            .map_err(|_| SubsiftError::Timeout { url: url.to_string() })?
            .map_err(|e| SubsiftError::navigation(url, e))?;

        self.settle(page).await;
        Ok(())
    }

    /// Wait for network quiescence, then the fixed post-load wait
    pub async fn settle(&self, page: &Page) {
        wait_for_network_idle(page, self.config.network_idle_timeout()).await;
        tokio::time::sleep(self.config.wait_after_load()).await;
    }

    /// Load saved cookies into the browser so pages open authenticated
    pub async fn install_credential(&self, credential: &SessionCredential) -> Result<()> {
        let cookies = credential
            .cookies()
            .iter()
            .filter_map(|c| match to_cookie_param(c) {
                Ok(param) => Some(param),
                Err(e) => {
                    warn!("Skipping cookie {}: {}", c.name, e);
                    None
                }
            })
            .collect::<Vec<_>>();

        let page = self.primary_page().await?;
        page.set_cookies(cookies)
            .await
            .map_err(|e| SubsiftError::browser("Failed to set cookies", e))?;
        Ok(())
    }

    /// Current cookies of the browsing context
    pub async fn export_credential(&self) -> Result<SessionCredential> {
        let page = self.primary_page().await?;
        let cookies = page
            .get_cookies()
            .await
            .map_err(|e| SubsiftError::browser("Failed to read cookies", e))?;

        Ok(SessionCredential::new(
            cookies
                .into_iter()
                .map(|c| SessionCookie {
                    name: c.name,
                    value: c.value,
                    domain: c.domain,
                    path: c.path,
                    expires: c.expires,
                    http_only: c.http_only,
                    secure: c.secure,
                })
                .collect(),
        ))
    }

    /// Close the browser and stop the event handler
    pub async fn shutdown(self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        let _ = browser.wait().await;
        self.handler.abort();
    }

    async fn blank_page(&self) -> Result<Page> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| SubsiftError::browser("Failed to create page", e))?;

        if let Some(ref ua) = self.config.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| SubsiftError::browser("Failed to set user agent", e))?;
        }

        Ok(page)
    }
}

#[async_trait]
impl FeedDriver for ChromeSession {
    async fn open_feed(&self, url: &str) -> Result<()> {
        let page = self.primary_page().await?;
        self.navigate(&page, url).await
    }

    async fn feed_links(&self) -> Result<Vec<FeedLink>> {
        let page = self.primary_page().await?;
        let html = page
            .content()
            .await
            .map_err(|e| SubsiftError::browser("Failed to read feed content", e))?;
        Ok(parse_feed_links(&html, &self.config.feed_link_selector))
    }

    async fn scroll(&self, pixels: u32) -> Result<()> {
        let page = self.primary_page().await?;
        page.evaluate(format!("window.scrollBy(0, {});", pixels))
            .await
            .map_err(|e| SubsiftError::browser("Scroll failed", e))?;
        Ok(())
    }
}

#[async_trait]
impl PageRenderer for ChromeSession {
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let page = self.blank_page().await?;

        let result = async {
            self.navigate(&page, url).await?;

            let html = page
                .content()
                .await
                .map_err(|e| SubsiftError::browser("Failed to read page content", e))?;
            let final_url = page
                .url()
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| url.to_string());

            Ok(RenderedPage {
                html,
                url: final_url,
            })
        }
        .await;

        if let Err(e) = page.close().await {
            debug!("Failed to close page for {}: {}", url, e);
        }

        result
    }
}

fn to_cookie_param(cookie: &SessionCookie) -> std::result::Result<CookieParam, String> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .path(cookie.path.clone())
        .http_only(cookie.http_only)
        .secure(cookie.secure);

    builder = if cookie.domain.is_empty() {
        builder.url(crate::scraper::SITE_ORIGIN)
    } else {
        builder.domain(cookie.domain.clone())
    };

    builder.build()
}

/// Heuristic network-idle wait: resolves once the page is loaded and the
/// resource count has been stable for a second, or when `timeout` elapses.
async fn wait_for_network_idle(page: &Page, timeout: std::time::Duration) {
    let timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
    let js = format!(
        r#"(async () => {{
            const timeoutMs = {timeout_ms};
            const idleMs = 1000;
            const interval = 250;
            const start = Date.now();
            let lastCount = -1;
            let stableMs = 0;

            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, interval));
                let count = lastCount;
                try {{ count = performance.getEntriesByType('resource').length; }} catch (_) {{}}
                if (document.readyState === 'complete' && count === lastCount) {{
                    stableMs += interval;
                    if (stableMs >= idleMs) {{
                        return {{ ok: true, waitedMs: Date.now() - start }};
                    }}
                }} else {{
                    stableMs = 0;
                }}
                lastCount = count;
            }}
            return {{ ok: false, waitedMs: Date.now() - start }};
        }})()"#
    );

    match page.evaluate(js).await {
        Ok(val) => {
            if let Ok(info) = val.into_value::<serde_json::Value>() {
                let ok = info.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
                let waited = info.get("waitedMs").and_then(|v| v.as_u64()).unwrap_or(0);
                if ok {
                    debug!("Network idle after {}ms", waited);
                } else {
                    debug!("Network idle wait gave up after {}ms", waited);
                }
            }
        }
        Err(e) => warn!("Network idle wait failed: {}", e),
    }
}
