use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::domain::{scrape_timestamp, PostRecord};
use crate::scraper::comments::CommentStrategy;
use crate::scraper::FeedLink;

/// Canonical origin that relative permalinks are resolved against.
pub const SITE_ORIGIN: &str = "https://www.reddit.com";

/// Extracts a [`PostRecord`] from the rendered HTML of a single post page.
///
/// Field lookups follow a fixed fallback order:
///
/// | field      | tried in order                                                        |
/// |------------|-----------------------------------------------------------------------|
/// | title      | `post-title` attr, `shreddit-title[title]`, `shreddit-title` text      |
/// | body       | `div[id$=-post-rtjson-content].md`, `div[id^=<root id>][id$=…]`        |
/// | permalink  | `permalink` attr, page URL; both joined against [`SITE_ORIGIN`]        |
///
/// A missing field degrades to an empty string. A missing `shreddit-post`
/// root, or a root without an id, means there is no post on the page.
#[derive(Debug, Clone, Default)]
pub struct PostExtractor {
    strategy: CommentStrategy,
}

impl PostExtractor {
    pub fn new(strategy: CommentStrategy) -> Self {
        Self { strategy }
    }

    /// Returns `None` for removed posts, ad slots and pages that are not posts.
    pub fn extract(&self, html: &str, page_url: &str) -> Option<PostRecord> {
        if html.trim().is_empty() {
            return None;
        }

        let document = Html::parse_document(html);
        let root_selector = Selector::parse("shreddit-post").ok()?;
        let root = document.select(&root_selector).next()?;
        let post_id = non_blank(root.value().attr("id"))?;

        let attr = |name: &str| root.value().attr(name).unwrap_or_default().to_string();
        let permalink_source = root.value().attr("permalink").unwrap_or(page_url);

        Some(PostRecord {
            subreddit: attr("subreddit-name"),
            permalink: resolve_permalink(permalink_source),
            created_utc: attr("created-timestamp"),
            author: attr("author"),
            title: title(root, &document),
            body: body(&document, &post_id),
            all_comments: self.strategy.extract(&document),
            scraped_at: scrape_timestamp(),
            post_id,
        })
    }
}

fn title(root: ElementRef, document: &Html) -> String {
    non_blank(root.value().attr("post-title"))
        .or_else(|| {
            let selector = Selector::parse("shreddit-title").ok()?;
            let element = document.select(&selector).next()?;
            non_blank(element.value().attr("title")).or_else(|| non_blank(Some(text_of(element).as_str())))
        })
        .unwrap_or_default()
}

fn body(document: &Html, root_id: &str) -> String {
    let by_marker = Selector::parse(r#"div[id$="-post-rtjson-content"].md"#)
        .ok()
        .and_then(|selector| document.select(&selector).next());

    by_marker
        .or_else(|| {
            let css = format!(
                r#"div[id^="{}"][id$="-post-rtjson-content"]"#,
                escape_css_string(root_id)
            );
            let selector = Selector::parse(&css).ok()?;
            document.select(&selector).next()
        })
        .map(text_of)
        .unwrap_or_default()
}

/// Join against the site origin; keep the raw value if it cannot be joined.
pub fn resolve_permalink(raw: &str) -> String {
    Url::parse(SITE_ORIGIN)
        .and_then(|origin| origin.join(raw))
        .map(String::from)
        .unwrap_or_else(|_| raw.to_string())
}

/// Enumerate post links on a rendered feed page, in document order.
pub fn parse_feed_links(html: &str, link_selector: &str) -> Vec<FeedLink> {
    let document = Html::parse_document(html);
    let (Ok(links), Ok(label_selector)) = (
        Selector::parse(link_selector),
        Selector::parse("faceplate-screen-reader-content"),
    ) else {
        tracing::warn!("Invalid feed link selector: {}", link_selector);
        return Vec::new();
    };

    document
        .select(&links)
        .filter_map(|a| {
            let href = non_blank(a.value().attr("href"))?;
            let label = a.select(&label_selector).next().map(text_of).unwrap_or_default();
            Some(FeedLink { href, label })
        })
        .collect()
}

/// Text nodes of an element, trimmed and joined with single spaces.
pub(crate) fn text_of(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn escape_css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
