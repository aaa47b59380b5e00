//! # subsift
//!
//! Scrolls a subreddit feed in a headless browser, opens the posts it finds,
//! and keeps the ones whose title or body mention a keyword.
//!
//! ## Architecture
//!
//! subsift follows a staged pipeline:
//!
//! ```text
//! Session → Feed (scroll/scan) → PostSource → Keyword filter → Output
//! ```
//!
//! - [`session`]: Browser login and the exported cookie credential
//! - [`crawl`]: The scroll/dispatch state machine
//! - [`scraper`]: chromiumoxide feed driver and rendered post extraction
//! - [`fetcher`]: JSON-endpoint post source with bounded retries
//! - [`output`]: CSV table and per-post JSON tree
//!
//! ## Quick Start
//!
//! ```bash
//! # Save a logged-in session
//! SUBSIFT_PASSWORD=... subsift login -u someone
//!
//! # Collect up to 20 matching posts, opening at most 200
//! subsift crawl https://www.reddit.com/r/rust/ -k "async,tokio" --min-posts 20
//!
//! # Inspect one post through the JSON endpoint
//! subsift fetch https://www.reddit.com/r/rust/comments/abc123/title/
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) carries the loaded [`Config`](config::Config)
/// into every command.
pub mod app;

/// Command-line interface using clap.
///
/// - `crawl <feed-url>` - Crawl a feed and write matching posts
/// - `login` - Log in and save session cookies
/// - `fetch <post-url>` - Print one post as JSON
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/subsift/config.toml`, writing a commented default
/// file on first run.
pub mod config;

/// Crawl controller.
pub mod crawl;

/// Core domain models.
///
/// - [`PostRecord`](domain::PostRecord): One scraped post
/// - [`CommentNode`](domain::CommentNode) / [`ReplyNode`](domain::ReplyNode): Its comments
pub mod domain;

/// Direct requests against the post JSON endpoint.
pub mod fetcher;

/// CSV and JSON-tree output.
pub mod output;

pub mod pacing;

/// Headless-browser scraping via chromiumoxide.
///
/// - [`ChromeSession`](scraper::ChromeSession): Browser, feed page and candidate pages
/// - [`PostExtractor`](scraper::PostExtractor): Rendered markup to [`PostRecord`](domain::PostRecord)
/// - [`FeedDriver`](scraper::FeedDriver) / [`PostSource`](scraper::PostSource): Seams used by the crawler
pub mod scraper;

/// Login flow and session cookies.
pub mod session;

/// Keyword matching and slug generation.
pub mod text;
