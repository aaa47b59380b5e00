use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A scraped post together with its comment tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub subreddit: String,
    /// Opaque site identifier (`t3_…`). Never empty on an extracted record.
    pub post_id: String,
    pub permalink: String,
    /// Source-provided creation time, kept verbatim.
    pub created_utc: String,
    /// Empty for deleted accounts.
    pub author: String,
    pub title: String,
    pub body: String,
    /// Top-level comments in document order.
    pub all_comments: Vec<CommentNode>,
    #[serde(with = "iso_seconds")]
    pub scraped_at: DateTime<Utc>,
}

impl PostRecord {
    pub fn new(post_id: impl Into<String>) -> Self {
        Self {
            subreddit: String::new(),
            post_id: post_id.into(),
            permalink: String::new(),
            created_utc: String::new(),
            author: String::new(),
            title: String::new(),
            body: String::new(),
            all_comments: Vec::new(),
            scraped_at: scrape_timestamp(),
        }
    }

    /// Text the admission filter runs against.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }

    /// Number of comments and replies at every depth.
    pub fn comment_count(&self) -> usize {
        self.all_comments
            .iter()
            .map(|c| 1 + c.replies.iter().map(ReplyNode::thread_size).sum::<usize>())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    pub user: String,
    pub comment: String,
    pub replies: Vec<ReplyNode>,
}

/// A reply under a top-level comment.
///
/// With the flat comment strategy `replies` is always empty and is left out
/// of the serialized form; the threaded strategy fills it recursively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyNode {
    pub user: String,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<ReplyNode>,
}

impl ReplyNode {
    pub fn new(user: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            comment: comment.into(),
            replies: Vec::new(),
        }
    }

    fn thread_size(&self) -> usize {
        1 + self.replies.iter().map(ReplyNode::thread_size).sum::<usize>()
    }
}

/// Current UTC time truncated to whole seconds.
pub fn scrape_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// `YYYY-MM-DDTHH:MM:SSZ`
pub(crate) mod iso_seconds {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
