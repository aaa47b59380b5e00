//! Browser-driven scraping of feed pages and rendered post pages.
//!
//! # Architecture
//!
//! ```text
//! FeedDriver (feed page) → FeedLink → PostSource → PostRecord
//! ```
//!
//! The crawl controller only talks to the two traits defined here.
//! [`ChromeSession`] implements [`FeedDriver`] on top of chromiumoxide and
//! renders candidate pages for [`RenderedPostSource`]; the direct-request
//! alternative lives in [`crate::fetcher`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use subsift::scraper::{ChromeSession, CommentStrategy, PostExtractor, RenderedPostSource, ScraperConfig};
//!
//! let session = Arc::new(ChromeSession::launch(ScraperConfig::default()).await?);
//! let source = RenderedPostSource::new(session.clone(), PostExtractor::new(CommentStrategy::Flat));
//! let post = source.fetch_post("https://www.reddit.com/r/rust/comments/abc/x/").await?;
//! ```

mod chrome;
pub mod comments;
mod config;
pub mod extractor;

pub use chrome::ChromeSession;
pub use comments::CommentStrategy;
pub use config::{ScraperConfig, DEFAULT_USER_AGENT};
pub use extractor::{parse_feed_links, PostExtractor, SITE_ORIGIN};

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::PostRecord;

/// A post link as enumerated on the feed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLink {
    /// Raw `href`, usually site-relative
    pub href: String,
    /// Screen-reader title text of the link, may be empty
    pub label: String,
}

/// Fully rendered markup of a candidate page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    /// URL after redirects
    pub url: String,
}

/// The infinite-scroll feed page driven by the crawl controller
#[async_trait]
pub trait FeedDriver: Send + Sync {
    /// Navigate the feed page and wait for it to settle
    async fn open_feed(&self, url: &str) -> Result<()>;

    /// Post links currently rendered on the feed, in document order
    async fn feed_links(&self) -> Result<Vec<FeedLink>>;

    /// Issue one scroll pulse of `pixels` on the feed page
    async fn scroll(&self, pixels: u32) -> Result<()>;
}

/// Turns a candidate URL into a post record.
///
/// `Ok(None)` means the page holds no recognizable post (removed, ad,
/// unsupported layout). Errors are per-candidate failures.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_post(&self, url: &str) -> Result<Option<PostRecord>>;
}

/// Candidate page renderer backing [`RenderedPostSource`]
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Open `url` in an isolated page, wait for it to settle, and return its markup
    async fn render(&self, url: &str) -> Result<RenderedPage>;
}

/// Extracts posts from pages rendered by the browser
pub struct RenderedPostSource<R: PageRenderer> {
    renderer: Arc<R>,
    extractor: PostExtractor,
}

impl<R: PageRenderer> RenderedPostSource<R> {
    pub fn new(renderer: Arc<R>, extractor: PostExtractor) -> Self {
        Self {
            renderer,
            extractor,
        }
    }
}

#[async_trait]
impl<R: PageRenderer> PostSource for RenderedPostSource<R> {
    async fn fetch_post(&self, url: &str) -> Result<Option<PostRecord>> {
        let page = self.renderer.render(url).await?;
        Ok(self.extractor.extract(&page.html, &page.url))
    }
}
