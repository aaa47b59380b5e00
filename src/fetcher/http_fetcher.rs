use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::app::{Result, SubsiftError};
use crate::domain::post::iso_seconds;
use crate::domain::{scrape_timestamp, CommentNode, PostRecord, ReplyNode};
use crate::fetcher::retry::{RetryOutcome, RetryPolicy};
use crate::fetcher::ApiConfig;
use crate::scraper::extractor::resolve_permalink;
use crate::scraper::{CommentStrategy, PostSource, SITE_ORIGIN};
use crate::session::SessionCredential;

/// Post source that reads the site's JSON endpoint directly, authenticated
/// with a cookie taken from a browser login.
pub struct ApiPostSource {
    client: Client,
    api_origin: Url,
    policy: RetryPolicy,
    strategy: CommentStrategy,
}

impl ApiPostSource {
    /// Fails with `SessionCookieMissing` if the credential lacks `cookie_name`.
    pub fn new(
        credential: &SessionCredential,
        cookie_name: &str,
        config: &ApiConfig,
        strategy: CommentStrategy,
    ) -> Result<Self> {
        let cookie = credential.cookie_header(cookie_name)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        let mut cookie = HeaderValue::from_str(&cookie)
            .map_err(|e| SubsiftError::Config(format!("Invalid cookie value: {}", e)))?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_origin: Url::parse(&config.origin)?,
            policy: config.retry_policy(),
            strategy,
        })
    }

    /// JSON endpoint for a post id, e.g. `/comments/abc123.json?raw_json=1`
    pub fn endpoint(&self, post_id: &str) -> Result<Url> {
        let mut url = self.api_origin.join(&format!("/comments/{}.json", post_id))?;
        url.set_query(Some("raw_json=1"));
        Ok(url)
    }

    async fn fetch_once(&self, endpoint: &Url) -> Result<Vec<Listing>> {
        let response = self.client.get(endpoint.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SubsiftError::UnexpectedStatus {
                url: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl PostSource for ApiPostSource {
    async fn fetch_post(&self, url: &str) -> Result<Option<PostRecord>> {
        let Some(post_id) = post_id_from_url(url) else {
            debug!("No post id in {}", url);
            return Ok(None);
        };
        let endpoint = self.endpoint(&post_id)?;

        match self
            .policy
            .run(endpoint.as_str(), |_| self.fetch_once(&endpoint))
            .await
        {
            RetryOutcome::Succeeded { value, .. } => Ok(listing_to_record(value, self.strategy)),
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => Err(SubsiftError::RetriesExhausted {
                url: url.to_string(),
                attempts,
                last_error: last_error.to_string(),
            }),
        }
    }
}

/// Post id from a permalink: the path segment following `comments`.
pub fn post_id_from_url(url: &str) -> Option<String> {
    let url = Url::parse(SITE_ORIGIN).ok()?.join(url).ok()?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    segments.find(|s| *s == "comments")?;
    segments.next().map(String::from)
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiPost {
    id: String,
    name: String,
    title: String,
    selftext: String,
    author: String,
    subreddit: String,
    permalink: String,
    created_utc: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiComment {
    author: String,
    body: String,
    /// Either an empty string or a nested listing
    replies: serde_json::Value,
}

impl Thing {
    fn as_comment(&self) -> Option<ApiComment> {
        (self.kind == "t1")
            .then(|| serde_json::from_value(self.data.clone()).ok())
            .flatten()
    }
}

impl ApiComment {
    fn reply_things(&self) -> Vec<Thing> {
        if !self.replies.is_object() {
            return Vec::new();
        }
        serde_json::from_value::<Listing>(self.replies.clone())
            .map(|listing| listing.data.children)
            .unwrap_or_default()
    }

    fn replies(&self, strategy: CommentStrategy) -> Vec<ReplyNode> {
        self.reply_things()
            .iter()
            .filter_map(Thing::as_comment)
            .map(|reply| ReplyNode {
                replies: match strategy {
                    CommentStrategy::Flat => Vec::new(),
                    CommentStrategy::Threaded => reply.replies(strategy),
                },
                user: reply.author,
                comment: reply.body,
            })
            .collect()
    }
}

fn listing_to_record(listings: Vec<Listing>, strategy: CommentStrategy) -> Option<PostRecord> {
    let mut listings = listings.into_iter();
    let post_thing = listings
        .next()?
        .data
        .children
        .into_iter()
        .find(|t| t.kind == "t3")?;
    let post: ApiPost = serde_json::from_value(post_thing.data).ok()?;

    let post_id = if !post.name.is_empty() {
        post.name
    } else if !post.id.is_empty() {
        format!("t3_{}", post.id)
    } else {
        return None;
    };

    let all_comments = listings
        .next()
        .map(|listing| {
            listing
                .data
                .children
                .iter()
                .filter_map(Thing::as_comment)
                .map(|comment| CommentNode {
                    replies: comment.replies(strategy),
                    user: comment.author,
                    comment: comment.body,
                })
                .collect()
        })
        .unwrap_or_default();

    Some(PostRecord {
        subreddit: post.subreddit,
        post_id,
        permalink: if post.permalink.is_empty() {
            String::new()
        } else {
            resolve_permalink(&post.permalink)
        },
        created_utc: post
            .created_utc
            .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
            .map(|dt| iso_seconds::format(&dt))
            .unwrap_or_default(),
        author: post.author,
        title: post.title,
        body: post.selftext,
        all_comments,
        scraped_at: scrape_timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::Backoff;
    use crate::pacing::DelayRange;
    use crate::session::SessionCookie;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing() -> serde_json::Value {
        json!([
            {"kind": "Listing", "data": {"children": [
                {"kind": "t3", "data": {
                    "id": "abc123", "name": "t3_abc123", "title": "GPT in class",
                    "selftext": "Is it allowed?", "author": "op", "subreddit": "nus",
                    "permalink": "/r/nus/comments/abc123/gpt_in_class/",
                    "created_utc": 1714566645.0
                }}
            ]}},
            {"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {"author": "alice", "body": "Ask the prof", "replies": {
                    "kind": "Listing", "data": {"children": [
                        {"kind": "t1", "data": {"author": "bob", "body": "Agreed", "replies": {
                            "kind": "Listing", "data": {"children": [
                                {"kind": "t1", "data": {"author": "carol", "body": "Same", "replies": ""}}
                            ]}
                        }}},
                        {"kind": "more", "data": {"count": 4}}
                    ]}
                }}},
                {"kind": "t1", "data": {"author": "dave", "body": "No", "replies": ""}}
            ]}}
        ])
    }

    fn config(origin: &str) -> ApiConfig {
        ApiConfig {
            origin: origin.to_string(),
            backoff: Backoff::Uniform(DelayRange::NONE),
            ..ApiConfig::default()
        }
    }

    fn credential() -> SessionCredential {
        SessionCredential::new(vec![SessionCookie::new("reddit_session", "tok")])
    }

    #[test]
    fn test_post_id_from_url() {
        assert_eq!(
            post_id_from_url("https://www.reddit.com/r/nus/comments/abc123/some_title/"),
            Some("abc123".into())
        );
        assert_eq!(post_id_from_url("/r/nus/comments/xyz/"), Some("xyz".into()));
        assert_eq!(post_id_from_url("https://www.reddit.com/r/nus/"), None);
        assert_eq!(post_id_from_url("/r/nus/comments/"), None);
    }

    #[test]
    fn test_listing_to_record_flat() {
        let listings: Vec<Listing> = serde_json::from_value(listing()).unwrap();
        let post = listing_to_record(listings, CommentStrategy::Flat).unwrap();

        assert_eq!(post.post_id, "t3_abc123");
        assert_eq!(post.title, "GPT in class");
        assert_eq!(post.body, "Is it allowed?");
        assert_eq!(post.created_utc, "2024-05-01T12:30:45Z");
        assert_eq!(
            post.permalink,
            "https://www.reddit.com/r/nus/comments/abc123/gpt_in_class/"
        );
        assert_eq!(post.all_comments.len(), 2);
        assert_eq!(post.all_comments[0].replies.len(), 1);
        assert_eq!(post.all_comments[0].replies[0].user, "bob");
        assert!(post.all_comments[0].replies[0].replies.is_empty());
        assert!(post.all_comments[1].replies.is_empty());
    }

    #[test]
    fn test_listing_to_record_threaded() {
        let listings: Vec<Listing> = serde_json::from_value(listing()).unwrap();
        let post = listing_to_record(listings, CommentStrategy::Threaded).unwrap();
        let bob = &post.all_comments[0].replies[0];
        assert_eq!(bob.replies.len(), 1);
        assert_eq!(bob.replies[0].user, "carol");
        assert_eq!(post.comment_count(), 4);
    }

    #[test]
    fn test_listing_without_post_is_absent() {
        let listings: Vec<Listing> =
            serde_json::from_value(json!([{"kind": "Listing", "data": {"children": []}}])).unwrap();
        assert!(listing_to_record(listings, CommentStrategy::Flat).is_none());
    }

    #[test]
    fn test_requires_session_cookie() {
        let empty = SessionCredential::default();
        let err = ApiPostSource::new(&empty, "reddit_session", &ApiConfig::default(), CommentStrategy::Flat)
            .err()
            .unwrap();
        assert!(matches!(err, SubsiftError::SessionCookieMissing(_)));
    }

    #[tokio::test]
    async fn test_fetch_post_sends_cookie_and_parses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/comments/abc123.json"))
            .and(query_param("raw_json", "1"))
            .and(header("cookie", "reddit_session=tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .expect(1)
            .mount(&server)
            .await;

        let source = ApiPostSource::new(
            &credential(),
            "reddit_session",
            &config(&server.uri()),
            CommentStrategy::Flat,
        )
        .unwrap();

        let post = source
            .fetch_post("https://www.reddit.com/r/nus/comments/abc123/gpt_in_class/")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(post.post_id, "t3_abc123");
    }

    #[tokio::test]
    async fn test_fetch_post_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/comments/abc123.json"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/comments/abc123.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .expect(1)
            .mount(&server)
            .await;

        let source = ApiPostSource::new(
            &credential(),
            "reddit_session",
            &config(&server.uri()),
            CommentStrategy::Flat,
        )
        .unwrap();

        let post = source.fetch_post("/r/nus/comments/abc123/").await.unwrap();
        assert!(post.is_some());
    }

    #[tokio::test]
    async fn test_fetch_post_gives_up_after_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/comments/abc123.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .expect(3)
            .mount(&server)
            .await;

        let source = ApiPostSource::new(
            &credential(),
            "reddit_session",
            &config(&server.uri()),
            CommentStrategy::Flat,
        )
        .unwrap();

        let err = source.fetch_post("/r/nus/comments/abc123/").await.unwrap_err();
        assert!(matches!(err, SubsiftError::RetriesExhausted { attempts: 3, .. }));
    }
}
