//! Persists collected posts as a flat CSV table and a tree of JSON documents.
//!
//! ```text
//! <csv_path>                                   one row per post, no comments
//! <json_dir>/<subreddit>/<slug>/<post_id>.json full record with comment tree
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::Result;
use crate::domain::PostRecord;
use crate::text::{slugify, DEFAULT_SLUG_LEN};

pub const CSV_HEADER: [&str; 7] = [
    "post_id",
    "subreddit",
    "created_utc",
    "author",
    "title",
    "body",
    "permalink",
];

/// Replacement for path components that sanitize to nothing
const UNKNOWN_COMPONENT: &str = "unknown";

/// The `[output]` section of the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_path: PathBuf,
    pub json_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("reddit_posts_and_first_comments.csv"),
            json_dir: PathBuf::from("data"),
        }
    }
}

/// What a write produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSummary {
    pub rows: usize,
    pub documents: usize,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    post_id: &'a str,
    subreddit: &'a str,
    created_utc: &'a str,
    author: &'a str,
    title: &'a str,
    body: &'a str,
    permalink: &'a str,
}

impl<'a> From<&'a PostRecord> for CsvRow<'a> {
    fn from(r: &'a PostRecord) -> Self {
        Self {
            post_id: &r.post_id,
            subreddit: &r.subreddit,
            created_utc: &r.created_utc,
            author: &r.author,
            title: &r.title,
            body: &r.body,
            permalink: &r.permalink,
        }
    }
}

pub struct OutputWriter;

impl OutputWriter {
    /// Write the CSV table and the JSON tree, replacing earlier output for
    /// the same posts.
    pub fn write(records: &[PostRecord], csv_path: &Path, tree_root: &Path) -> Result<OutputSummary> {
        let rows = Self::write_csv(records, csv_path)?;
        info!("CSV -> {} ({} rows)", csv_path.display(), rows);

        let mut documents = 0;
        for record in records {
            let path = Self::write_document(record, tree_root)?;
            debug!("Wrote {}", path.display());
            documents += 1;
        }
        info!(
            "JSON -> {}/<subreddit>/<slug>/<post_id>.json ({} documents)",
            tree_root.display(),
            documents
        );

        Ok(OutputSummary { rows, documents })
    }

    pub fn write_csv(records: &[PostRecord], path: &Path) -> Result<usize> {
        ensure_parent(path)?;

        // Header written by hand so an empty crawl still yields a valid table
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(CSV_HEADER)?;
        for record in records {
            writer.serialize(CsvRow::from(record))?;
        }
        writer.flush()?;
        Ok(records.len())
    }

    /// Write one record below `root`, returning the file path.
    pub fn write_document(record: &PostRecord, root: &Path) -> Result<PathBuf> {
        let path = document_path(root, record);
        ensure_parent(&path)?;

        let mut json = serde_json::to_string_pretty(record)?;
        json.push('\n');
        fs::write(&path, json)?;
        Ok(path)
    }
}

/// `<root>/<subreddit>/<slug(title)>/<post_id>.json`
pub fn document_path(root: &Path, record: &PostRecord) -> PathBuf {
    root.join(safe_component(&record.subreddit))
        .join(slugify(&record.title, DEFAULT_SLUG_LEN))
        .join(format!("{}.json", safe_component(&record.post_id)))
}

/// Reduce `raw` to `[A-Za-z0-9_-]` so it can't traverse out of its parent.
pub fn safe_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        UNKNOWN_COMPONENT.to_string()
    } else {
        cleaned
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommentNode, ReplyNode};
    use tempfile::TempDir;

    fn sample(post_id: &str, subreddit: &str, title: &str) -> PostRecord {
        let mut record = PostRecord::new(post_id);
        record.subreddit = subreddit.into();
        record.title = title.into();
        record.body = "Body, with \"quotes\"\nand a newline".into();
        record.author = "alice".into();
        record.created_utc = "2024-05-01T10:00:00.000Z".into();
        record.permalink = format!("https://www.reddit.com/r/{}/comments/x/", subreddit);
        record.all_comments = vec![CommentNode {
            user: "bob".into(),
            comment: "first!".into(),
            replies: vec![ReplyNode::new("carol", "second")],
        }];
        record
    }

    #[test]
    fn test_write_layout() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("out/posts.csv");
        let root = dir.path().join("data");
        let records = vec![sample("t3_a1", "nus", "Hello World"), sample("t3_b2", "nus", "Second")];

        let summary = OutputWriter::write(&records, &csv_path, &root).unwrap();
        assert_eq!(summary, OutputSummary { rows: 2, documents: 2 });

        assert!(root.join("nus/hello-world/t3_a1.json").is_file());
        assert!(root.join("nus/second/t3_b2.json").is_file());

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, CSV_HEADER);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "t3_a1");
        assert_eq!(&rows[0][5], "Body, with \"quotes\"\nand a newline");
    }

    #[test]
    fn test_document_contains_comment_tree() {
        let dir = TempDir::new().unwrap();
        let record = sample("t3_a1", "nus", "Hello");
        let path = OutputWriter::write_document(&record, dir.path()).unwrap();

        let parsed: PostRecord = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("posts.csv");
        let root = dir.path().join("data");
        let records = vec![sample("t3_a1", "nus", "Hello")];

        OutputWriter::write(&records, &csv_path, &root).unwrap();
        let csv_first = fs::read(&csv_path).unwrap();
        let json_first = fs::read(root.join("nus/hello/t3_a1.json")).unwrap();

        OutputWriter::write(&records, &csv_path, &root).unwrap();
        assert_eq!(fs::read(&csv_path).unwrap(), csv_first);
        assert_eq!(fs::read(root.join("nus/hello/t3_a1.json")).unwrap(), json_first);
    }

    #[test]
    fn test_empty_records_still_write_header() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("posts.csv");
        let summary = OutputWriter::write(&[], &csv_path, &dir.path().join("data")).unwrap();

        assert_eq!(summary.rows, 0);
        let content = fs::read_to_string(&csv_path).unwrap();
        assert_eq!(content.trim_end(), CSV_HEADER.join(","));
    }

    #[test]
    fn test_non_ascii_preserved() {
        let dir = TempDir::new().unwrap();
        let mut record = sample("t3_u", "nus", "Café Review");
        record.body = "Ngon quá! 🍜".into();
        let path = OutputWriter::write_document(&record, dir.path()).unwrap();

        assert!(path.ends_with("nus/cafe-review/t3_u.json"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("Ngon quá! 🍜"));
        assert!(!content.contains("\\u"));
    }

    #[test]
    fn test_hostile_components_stay_under_root() {
        let dir = TempDir::new().unwrap();
        let record = sample("../../etc/passwd", "..", "../../escape");
        let path = OutputWriter::write_document(&record, dir.path()).unwrap();

        assert!(path.starts_with(dir.path()));
        assert_eq!(path, dir.path().join("__/escape/______etc_passwd.json"));
    }

    #[test]
    fn test_safe_component() {
        assert_eq!(safe_component("AskReddit"), "AskReddit");
        assert_eq!(safe_component("t3_1abc-x"), "t3_1abc-x");
        assert_eq!(safe_component("a/b c"), "a_b_c");
        assert_eq!(safe_component(""), "unknown");
        assert_eq!(safe_component("   "), "unknown");
    }
}
