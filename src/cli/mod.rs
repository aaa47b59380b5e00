pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::scraper::CommentStrategy;

#[derive(Parser)]
#[command(name = "subsift")]
#[command(about = "Collect keyword-matching posts from a subreddit feed", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/subsift/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scroll a feed and save the posts that match the keywords
    Crawl(CrawlArgs),
    /// Log in through the browser and save the session cookies
    Login {
        #[command(flatten)]
        auth: AuthArgs,

        /// Where to save the cookies
        #[arg(long)]
        session: Option<PathBuf>,

        /// Show the browser window
        #[arg(long)]
        headful: bool,
    },
    /// Fetch a single post through the JSON endpoint and print it
    Fetch {
        /// Post URL or permalink
        url: String,

        /// Saved session cookies
        #[arg(long)]
        session: Option<PathBuf>,

        /// Comment tree depth
        #[arg(long, value_enum)]
        comments: Option<CommentStrategy>,
    },
}

/// Where candidate posts are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Open every candidate page in the browser
    Rendered,
    /// Request the JSON endpoint with the session cookie
    Api,
}

#[derive(Args)]
pub struct CrawlArgs {
    /// Feed URL, e.g. https://www.reddit.com/r/rust/
    pub feed_url: String,

    /// Comma-separated keywords (default: from config)
    #[arg(short, long)]
    pub keywords: Option<String>,

    /// Maximum number of posts to open
    #[arg(long)]
    pub max_posts: Option<usize>,

    /// Stop after this many matching posts
    #[arg(long)]
    pub min_posts: Option<usize>,

    /// Scroll pulses per pass
    #[arg(long)]
    pub scrolls: Option<u32>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    #[arg(long, value_enum, default_value_t = SourceKind::Rendered)]
    pub source: SourceKind,

    /// Comment tree depth
    #[arg(long, value_enum)]
    pub comments: Option<CommentStrategy>,

    /// CSV output path
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Root directory of the JSON tree
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Log in before crawling instead of reusing saved cookies
    #[arg(long)]
    pub login: bool,

    /// Saved session cookies
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// Skip candidates whose link text contains no keyword
    #[arg(long)]
    pub prefilter: bool,

    #[command(flatten)]
    pub auth: AuthArgs,
}

#[derive(Args)]
pub struct AuthArgs {
    /// Account name for --login
    #[arg(short, long, env = "SUBSIFT_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "SUBSIFT_PASSWORD", hide_env_values = true, hide = true)]
    pub password: Option<String>,
}
