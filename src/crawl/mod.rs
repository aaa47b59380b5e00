//! Crawl controller: walks an infinite-scroll feed and collects matching posts.
//!
//! The controller alternates between dispatching discovered links to a
//! [`PostSource`] and scrolling the [`FeedDriver`] for more, until one of
//! these things happens:
//!
//! - enough posts matched the keywords ([`EndReason::GoalMet`])
//! - `max_posts` candidates were opened ([`EndReason::CapReached`])
//! - a scroll-and-scan pass turned up nothing new ([`EndReason::Exhausted`])
//! - the feed could not be read [`MAX_SCAN_FAILURES`] times in a row
//!   ([`EndReason::ScanFailed`]); a single failed read only triggers another pass
//!
//! Per-candidate failures are logged and skipped; only failing to open the
//! feed itself aborts the crawl.

mod state;

pub use state::{normalize_link, Candidate, CrawlState, EndReason, Phase};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::domain::PostRecord;
use crate::pacing::DelayRange;
use crate::scraper::{CommentStrategy, FeedDriver, PostSource};
use crate::text::KeywordSet;

/// Consecutive failed feed reads after which the crawl gives up
pub const MAX_SCAN_FAILURES: u32 = 3;

/// The `[crawl]` section of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Admission keywords, matched case-insensitively as substrings
    pub keywords: KeywordSet,
    /// Upper bound on candidates opened (default: 200)
    pub max_posts: usize,
    /// Stop once this many posts matched (default: 100)
    pub min_posts: usize,
    /// Scroll pulses per scan pass (default: 5)
    pub scrolls: u32,
    /// Distance of one scroll pulse in pixels (default: 2500)
    pub scroll_px: u32,
    /// Wait after each scroll pulse
    pub scroll_settle: DelayRange,
    /// Wait before opening each candidate
    pub dispatch_settle: DelayRange,
    /// Skip candidates whose link text and URL miss every keyword
    pub prefilter_links: bool,
    pub comments: CommentStrategy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            keywords: KeywordSet::new(["OpenAI", "GPT", "Learning"]),
            max_posts: 200,
            min_posts: 100,
            scrolls: 5,
            scroll_px: 2500,
            scroll_settle: DelayRange::from_millis(800, 1500),
            dispatch_settle: DelayRange::from_millis(1000, 3000),
            prefilter_links: false,
            comments: CommentStrategy::default(),
        }
    }
}

impl CrawlConfig {
    pub fn params(&self, feed_url: impl Into<String>) -> CrawlParams {
        CrawlParams {
            feed_url: feed_url.into(),
            keywords: self.keywords.clone(),
            max_posts: self.max_posts,
            min_posts: self.min_posts,
            scrolls: self.scrolls,
            scroll_px: self.scroll_px,
            scroll_settle: self.scroll_settle,
            dispatch_settle: self.dispatch_settle,
            prefilter_links: self.prefilter_links,
        }
    }
}

/// Inputs of a single crawl run
#[derive(Debug, Clone)]
pub struct CrawlParams {
    pub feed_url: String,
    pub keywords: KeywordSet,
    pub max_posts: usize,
    pub min_posts: usize,
    pub scrolls: u32,
    pub scroll_px: u32,
    pub scroll_settle: DelayRange,
    pub dispatch_settle: DelayRange,
    pub prefilter_links: bool,
}

/// Summary of a finished crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub reason: EndReason,
    pub opened: usize,
    pub matched: usize,
    pub discovered: usize,
}

pub struct Crawler<'a> {
    feed: &'a dyn FeedDriver,
    source: &'a dyn PostSource,
}

impl<'a> Crawler<'a> {
    pub fn new(feed: &'a dyn FeedDriver, source: &'a dyn PostSource) -> Self {
        Self { feed, source }
    }

    /// Run one crawl, pushing matching posts onto `records` in discovery
    /// order. Records pushed before an early return stay in `records`.
    pub async fn run(&self, params: &CrawlParams, records: &mut Vec<PostRecord>) -> Result<CrawlReport> {
        let mut state = CrawlState::new();

        info!("Opening feed {}", params.feed_url);
        self.feed.open_feed(&params.feed_url).await?;

        let mut scan_failures = 0;
        let reason = loop {
            if state.matched() >= params.min_posts {
                break EndReason::GoalMet;
            }

            if state.at_end() {
                match self.scroll_and_scan(params, &mut state).await {
                    Some(0) => break EndReason::Exhausted,
                    Some(_) => scan_failures = 0,
                    None => {
                        scan_failures += 1;
                        if scan_failures >= MAX_SCAN_FAILURES {
                            break EndReason::ScanFailed;
                        }
                    }
                }
                continue;
            }

            if state.opened() >= params.max_posts {
                break EndReason::CapReached;
            }

            if let Some(candidate) = state.advance() {
                self.dispatch(params, &candidate, &mut state, records).await;
                state.finish_dispatch();
            }
        };

        state.enter(Phase::Done(reason));
        let report = CrawlReport {
            reason,
            opened: state.opened(),
            matched: state.matched(),
            discovered: state.discovered(),
        };
        info!(
            "Crawl finished ({}): opened {}, matched {}, discovered {}",
            report.reason, report.opened, report.matched, report.discovered
        );
        Ok(report)
    }

    /// One scroll pass and feed read. Returns the number of new links, or
    /// `None` if the feed could not be read.
    async fn scroll_and_scan(&self, params: &CrawlParams, state: &mut CrawlState) -> Option<usize> {
        state.enter(Phase::Scrolling);
        for _ in 0..params.scrolls {
            if let Err(e) = self.feed.scroll(params.scroll_px).await {
                warn!("Scroll failed: {}", e);
            }
            params.scroll_settle.pause().await;
        }

        state.enter(Phase::Scanning);
        let links = match self.feed.feed_links().await {
            Ok(links) => links,
            Err(e) => {
                warn!("Failed to enumerate feed links: {}", e);
                return None;
            }
        };
        let visible = links.len();
        let added = state.absorb(links);
        info!(
            "Scanned feed: {} links visible, {} new, {} discovered in total",
            visible,
            added,
            state.discovered()
        );
        Some(added)
    }

    async fn dispatch(
        &self,
        params: &CrawlParams,
        candidate: &Candidate,
        state: &mut CrawlState,
        records: &mut Vec<PostRecord>,
    ) {
        if params.prefilter_links
            && !params.keywords.matches(&candidate.label)
            && !params.keywords.matches(&candidate.url)
        {
            debug!("Skipping {} (link text misses keywords)", candidate.url);
            return;
        }

        params.dispatch_settle.pause().await;
        debug!("[{}/{}] Opening {}", state.opened(), params.max_posts, candidate.url);

        match self.source.fetch_post(&candidate.url).await {
            Err(e) => warn!("Skipping {}: {}", candidate.url, e),
            Ok(None) => debug!("No post found at {}", candidate.url),
            Ok(Some(post)) if params.keywords.matches(&post.searchable_text()) => {
                state.record_match();
                info!(
                    "Matched post {} ({}/{}, {} comments): {}",
                    post.post_id,
                    state.matched(),
                    params.min_posts,
                    post.comment_count(),
                    post.title
                );
                records.push(post);
            }
            Ok(Some(post)) => debug!("Post {} misses keywords", post.post_id),
        }
    }
}
