use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::{AppContext, Result, SubsiftError};
use crate::cli::{AuthArgs, CrawlArgs, SourceKind};
use crate::crawl::{CrawlReport, Crawler};
use crate::fetcher::ApiPostSource;
use crate::output::OutputWriter;
use crate::scraper::{ChromeSession, CommentStrategy, PostExtractor, PostSource, RenderedPostSource};
use crate::session::{self, SessionConfig, SessionCredential};
use crate::text::KeywordSet;

pub async fn crawl(ctx: &AppContext, args: CrawlArgs) -> Result<()> {
    let config = &ctx.config;

    let mut crawl_config = config.crawl.clone();
    if let Some(ref keywords) = args.keywords {
        crawl_config.keywords = KeywordSet::parse_list(keywords);
    }
    if let Some(n) = args.max_posts {
        crawl_config.max_posts = n;
    }
    if let Some(n) = args.min_posts {
        crawl_config.min_posts = n;
    }
    if let Some(n) = args.scrolls {
        crawl_config.scrolls = n;
    }
    if args.prefilter {
        crawl_config.prefilter_links = true;
    }
    if crawl_config.keywords.is_empty() {
        return Err(SubsiftError::Config("No keywords given; nothing could match".into()));
    }
    let strategy = args.comments.unwrap_or(crawl_config.comments);
    let params = crawl_config.params(args.feed_url.as_str());

    let session_config = session_settings(&config.session, args.session.as_deref());
    let mut browser_config = config.browser.clone();
    if args.headful {
        browser_config.headless = false;
    }

    let browser = Arc::new(ChromeSession::launch(browser_config).await?);

    let mut records = Vec::new();
    let outcome: Result<CrawlReport> = async {
        let credential = authenticate(ctx, &browser, &session_config, args.login, &args.auth).await?;

        let source: Box<dyn PostSource> = match args.source {
            SourceKind::Rendered => Box::new(RenderedPostSource::new(
                browser.clone(),
                PostExtractor::new(strategy),
            )),
            SourceKind::Api => {
                let credential = credential
                    .ok_or_else(|| SubsiftError::SessionCookieMissing(session_config.cookie_name.clone()))?;
                Box::new(ApiPostSource::new(
                    &credential,
                    &session_config.cookie_name,
                    &config.api,
                    strategy,
                )?)
            }
        };

        Crawler::new(browser.as_ref(), source.as_ref())
            .run(&params, &mut records)
            .await
    }
    .await;

    close_browser(browser).await;
    let report = outcome?;

    let csv_path = args.csv.unwrap_or_else(|| config.output.csv_path.clone());
    let json_dir = args.out_dir.unwrap_or_else(|| config.output.json_dir.clone());
    let summary = OutputWriter::write(&records, &csv_path, &json_dir)?;

    print_report(&report);
    println!("CSV:  {} ({} rows)", csv_path.display(), summary.rows);
    println!("JSON: {} ({} documents)", json_dir.display(), summary.documents);
    Ok(())
}

pub async fn login(ctx: &AppContext, auth: &AuthArgs, session_file: Option<PathBuf>, headful: bool) -> Result<()> {
    let session_config = session_settings(&ctx.config.session, session_file.as_deref());
    let credentials = ctx.credentials(auth.username.as_deref(), auth.password.as_deref())?;

    let mut browser_config = ctx.config.browser.clone();
    if headful {
        browser_config.headless = false;
    }
    let browser = ChromeSession::launch(browser_config).await?;
    let result = session::login_and_export(&browser, &credentials, &session_config).await;
    browser.shutdown().await;

    let credential = result?;
    println!(
        "Logged in as {}; saved {} cookies to {}",
        credentials.username,
        credential.cookies().len(),
        session_config.session_file.display()
    );
    Ok(())
}

pub async fn fetch(
    ctx: &AppContext,
    url: &str,
    session_file: Option<PathBuf>,
    comments: Option<CommentStrategy>,
) -> Result<()> {
    let session_config = session_settings(&ctx.config.session, session_file.as_deref());
    let credential = ctx
        .saved_credential(&session_config.session_file)?
        .ok_or_else(|| {
            SubsiftError::Config(format!(
                "No saved session at {}; run `subsift login` first",
                session_config.session_file.display()
            ))
        })?;

    let strategy = comments.unwrap_or(ctx.config.crawl.comments);
    let source = ApiPostSource::new(&credential, &session_config.cookie_name, &ctx.config.api, strategy)?;

    match source.fetch_post(url).await? {
        Some(post) => println!("{}", serde_json::to_string_pretty(&post)?),
        None => println!("No post found at {}", url),
    }
    Ok(())
}

/// Make the browser context authenticated, either by logging in or by
/// installing saved cookies. Returns the credential in use, if any.
async fn authenticate(
    ctx: &AppContext,
    browser: &ChromeSession,
    session_config: &SessionConfig,
    fresh_login: bool,
    auth: &AuthArgs,
) -> Result<Option<SessionCredential>> {
    if fresh_login {
        let credentials = ctx.credentials(auth.username.as_deref(), auth.password.as_deref())?;
        let credential = session::login_and_export(browser, &credentials, session_config).await?;
        return Ok(Some(credential));
    }

    match ctx.saved_credential(&session_config.session_file)? {
        Some(credential) => {
            browser.install_credential(&credential).await?;
            info!(
                "Installed {} saved cookies from {}",
                credential.cookies().len(),
                session_config.session_file.display()
            );
            Ok(Some(credential))
        }
        None => {
            warn!(
                "No saved session at {}; crawling without logging in",
                session_config.session_file.display()
            );
            Ok(None)
        }
    }
}

fn session_settings(base: &SessionConfig, session_file: Option<&Path>) -> SessionConfig {
    let mut settings = base.clone();
    if let Some(path) = session_file {
        settings.session_file = path.to_path_buf();
    }
    settings
}

async fn close_browser(browser: Arc<ChromeSession>) {
    match Arc::try_unwrap(browser) {
        Ok(browser) => browser.shutdown().await,
        Err(_) => warn!("Browser still in use; leaving it to close on exit"),
    }
}

fn print_report(report: &CrawlReport) {
    println!("Crawl finished: {}", report.reason);
    println!("  Discovered: {}", report.discovered);
    println!("  Opened:     {}", report.opened);
    println!("  Matched:    {}", report.matched);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_settings_override() {
        let base = SessionConfig::default();
        assert_eq!(session_settings(&base, None).session_file, base.session_file);

        let overridden = session_settings(&base, Some(Path::new("/tmp/s.json")));
        assert_eq!(overridden.session_file, PathBuf::from("/tmp/s.json"));
        assert_eq!(overridden.cookie_name, base.cookie_name);
    }
}
