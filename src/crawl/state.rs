use std::collections::HashSet;
use std::fmt;

use tracing::trace;
use url::Url;

use crate::scraper::{FeedLink, SITE_ORIGIN};

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// `matched` reached `min_posts`
    GoalMet,
    /// `opened` reached `max_posts`
    CapReached,
    /// A scroll-and-scan pass found no unseen links
    Exhausted,
    /// Reading the feed failed on several passes in a row
    ScanFailed,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndReason::GoalMet => "goal met",
            EndReason::CapReached => "post cap reached",
            EndReason::Exhausted => "feed exhausted",
            EndReason::ScanFailed => "feed unreadable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Navigating,
    Scanning,
    Dispatching,
    Scrolling,
    Done(EndReason),
}

/// A discovered link waiting to be dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Position in discovery order
    pub index: usize,
    /// Normalized absolute URL, also the dedup key
    pub url: String,
    pub href: String,
    pub label: String,
}

/// Mutable bookkeeping of one crawl run.
///
/// `discovered` is append-only and `cursor` only moves forward, so a link is
/// dispatched at most once no matter how often the feed re-renders it.
#[derive(Debug)]
pub struct CrawlState {
    phase: Phase,
    discovered: Vec<Candidate>,
    seen: HashSet<String>,
    cursor: usize,
    opened: usize,
    matched: usize,
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Navigating,
            discovered: Vec::new(),
            seen: HashSet::new(),
            cursor: 0,
            opened: 0,
            matched: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            trace!("Crawl phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn discovered(&self) -> usize {
        self.discovered.len()
    }

    pub fn opened(&self) -> usize {
        self.opened
    }

    pub fn matched(&self) -> usize {
        self.matched
    }

    /// No undispatched links are known
    pub fn at_end(&self) -> bool {
        self.cursor >= self.discovered.len()
    }

    /// Record a scan of the feed; returns how many links were new.
    pub fn absorb(&mut self, links: Vec<FeedLink>) -> usize {
        let before = self.discovered.len();
        for link in links {
            let Some(url) = normalize_link(&link.href) else {
                trace!("Ignoring unusable link {:?}", link.href);
                continue;
            };
            if self.seen.insert(url.clone()) {
                self.discovered.push(Candidate {
                    index: self.discovered.len(),
                    url,
                    href: link.href,
                    label: link.label,
                });
            }
        }
        self.discovered.len() - before
    }

    /// Take the next candidate, advancing the cursor and the opened count
    /// before the caller processes it.
    pub fn advance(&mut self) -> Option<Candidate> {
        let candidate = self.discovered.get(self.cursor)?.clone();
        self.enter(Phase::Dispatching);
        self.cursor += 1;
        self.opened += 1;
        Some(candidate)
    }

    /// Count an admitted post.
    pub fn record_match(&mut self) {
        self.matched += 1;
    }

    /// The candidate taken by [`advance`](Self::advance) has been handled.
    pub fn finish_dispatch(&mut self) {
        self.enter(Phase::Scanning);
    }
}

/// Absolute URL without query or fragment, used as the dedup key.
pub fn normalize_link(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    let mut url = Url::parse(SITE_ORIGIN).ok()?.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}
