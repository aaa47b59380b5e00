use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::domain::{CommentNode, ReplyNode};
use crate::scraper::extractor::text_of;

const COMMENT_TAG: &str = "shreddit-comment";

/// How replies are attached to top-level comments.
///
/// - `Flat`: every depth-one comment in the whole document is listed as a
///   reply of every top-level comment. One level only.
/// - `Threaded`: replies are the comments nested directly inside their
///   parent, walked to arbitrary depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CommentStrategy {
    #[default]
    Flat,
    Threaded,
}

impl CommentStrategy {
    /// Extract the comment tree of a rendered post page.
    pub fn extract(&self, document: &Html) -> Vec<CommentNode> {
        let Some(selectors) = CommentSelectors::new() else {
            return Vec::new();
        };

        match self {
            CommentStrategy::Flat => flat(document, &selectors),
            CommentStrategy::Threaded => threaded(document, &selectors),
        }
    }
}

struct CommentSelectors {
    top_level: Selector,
    depth_one: Selector,
    any: Selector,
    body: Selector,
}

impl CommentSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            top_level: Selector::parse(r#"shreddit-comment[depth="0"]"#).ok()?,
            depth_one: Selector::parse(r#"shreddit-comment[depth="1"]"#).ok()?,
            any: Selector::parse(COMMENT_TAG).ok()?,
            body: Selector::parse(r#"[id*="-comment-rtjson-content"]"#).ok()?,
        })
    }
}

fn flat(document: &Html, selectors: &CommentSelectors) -> Vec<CommentNode> {
    let replies: Vec<ReplyNode> = document
        .select(&selectors.depth_one)
        .map(|reply| ReplyNode::new(author(reply), comment_text(reply, selectors)))
        .collect();

    document
        .select(&selectors.top_level)
        .map(|comment| CommentNode {
            user: author(comment),
            comment: comment_text(comment, selectors),
            replies: replies.clone(),
        })
        .collect()
}

fn threaded(document: &Html, selectors: &CommentSelectors) -> Vec<CommentNode> {
    document
        .select(&selectors.top_level)
        .map(|comment| CommentNode {
            user: author(comment),
            comment: comment_text(comment, selectors),
            replies: direct_replies(comment, selectors),
        })
        .collect()
}

fn direct_replies(parent: ElementRef, selectors: &CommentSelectors) -> Vec<ReplyNode> {
    parent
        .select(&selectors.any)
        .filter(|child| owned_by(*child, parent))
        .map(|child| ReplyNode {
            user: author(child),
            comment: comment_text(child, selectors),
            replies: direct_replies(child, selectors),
        })
        .collect()
}

fn author(comment: ElementRef) -> String {
    comment.value().attr("author").unwrap_or_default().to_string()
}

/// Body text of the comment itself, ignoring the bodies of nested replies.
fn comment_text(comment: ElementRef, selectors: &CommentSelectors) -> String {
    comment
        .select(&selectors.body)
        .find(|body| owned_by(*body, comment))
        .map(text_of)
        .unwrap_or_default()
}

/// True if the nearest enclosing comment of `el` is `comment`.
fn owned_by(el: ElementRef, comment: ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == COMMENT_TAG)
        .is_some_and(|ancestor| ancestor.id() == comment.id())
}
