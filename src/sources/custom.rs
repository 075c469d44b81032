//! User-supplied news source: an RSS/Atom feed or a JSON API.
//!
//! A body that parses as JSON is read through [`fields::item_list`] and the
//! alias tables in [`fields`]; anything else goes to the feed parser.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{Source, get_text};
use crate::dates::{format_timestamp, parse_timestamp};
use crate::error::{ItemMalformed, SourceError};
use crate::feed::{FeedItem, parse_feed};
use crate::fields::{self, IMAGE, PUBLISHED, SUMMARY, TITLE, URL};
use crate::models::{Details, Entry, EntryKind};
use crate::utils::{identity_key, truncate_chars};

const TIMEOUT: Duration = Duration::from_secs(10);
const SUMMARY_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct CustomFeed {
    client: reqwest::Client,
    url: String,
    name: String,
    limit: usize,
}

impl CustomFeed {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        name: impl Into<String>,
        limit: usize,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            name: name.into(),
            limit,
        }
    }

    fn news(
        &self,
        title: String,
        url: String,
        summary: &str,
        created: DateTime<Utc>,
        image: Option<String>,
    ) -> Entry {
        Entry {
            title,
            url,
            summary: truncate_chars(summary, SUMMARY_CHARS).to_string(),
            source: self.name.clone(),
            kind: EntryKind::News,
            created_at: format_timestamp(&created),
            image,
            images: Vec::new(),
            details: Details::News { points: None },
        }
    }

    fn from_feed_item(&self, item: &FeedItem, now: DateTime<Utc>) -> Result<Entry, ItemMalformed> {
        let title = item
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(ItemMalformed::MissingField("title"))?;
        let url = item
            .link
            .clone()
            .filter(|l| !l.is_empty())
            .ok_or(ItemMalformed::MissingField("url"))?;
        let created = item.timestamp().unwrap_or(now);
        Ok(self.news(
            title,
            url,
            &item.plain_summary(),
            created,
            item.image().map(str::to_string),
        ))
    }

    fn from_json_item(&self, item: &Value, now: DateTime<Utc>) -> Result<Entry, ItemMalformed> {
        let map = item.as_object().ok_or(ItemMalformed::NotAnObject)?;
        let title = TITLE
            .extract(map)
            .ok_or(ItemMalformed::MissingField(TITLE.field))?;
        let url = URL
            .extract(map)
            .ok_or(ItemMalformed::MissingField(URL.field))?;
        let created = PUBLISHED
            .extract(map)
            .and_then(|raw| parse_timestamp(&raw))
            .unwrap_or(now);
        let summary = SUMMARY.extract(map).unwrap_or_default();
        Ok(self.news(title, url, &summary, created, IMAGE.extract(map)))
    }

    /// Normalize, skip malformed items, dedupe on URL and cap at `limit`.
    fn collect<T>(
        &self,
        items: impl IntoIterator<Item = T>,
        normalize: impl Fn(T) -> Result<Entry, ItemMalformed>,
    ) -> Vec<Entry> {
        let mut seen = HashSet::new();
        items
            .into_iter()
            .filter_map(|item| match normalize(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(source = %self.name, error = %e, "Skipping item");
                    None
                }
            })
            .filter(|entry| seen.insert(identity_key(&entry.url)))
            .take(self.limit)
            .collect()
    }

    /// JSON when the body parses as JSON, otherwise RSS/Atom.
    fn parse_body(&self, body: &str, now: DateTime<Utc>) -> Result<Vec<Entry>, SourceError> {
        if let Ok(payload) = serde_json::from_str::<Value>(body) {
            return match fields::item_list(&payload) {
                Some(items) => Ok(self.collect(items, |item| self.from_json_item(item, now))),
                None => {
                    warn!(source = %self.name, "JSON payload has no item list");
                    Ok(Vec::new())
                }
            };
        }

        let items = parse_feed(body).map_err(|e| SourceError::Unparseable {
            url: self.url.clone(),
            reason: format!("neither JSON nor an RSS/Atom feed ({e})"),
        })?;
        debug!(count = items.len(), "Parsed body as feed");
        Ok(self.collect(&items, |item| self.from_feed_item(item, now)))
    }
}

impl Source for CustomFeed {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "info", skip_all, fields(url = %self.url, source = %self.name))]
    async fn try_fetch(&self) -> Result<Vec<Entry>, SourceError> {
        let body = get_text(self.client.get(&self.url).timeout(TIMEOUT), &self.url).await?;
        self.parse_body(&body, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::Client;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed(limit: usize) -> CustomFeed {
        CustomFeed::new(Client::new(), "https://feeds.example.com/ai", "example", limit)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap()
    }

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item>
    <title>First</title>
    <link>https://news.example.com/1</link>
    <description>Summary one</description>
    <pubDate>Thu, 02 Jan 2025 03:04:05 +0000</pubDate>
    <enclosure url="https://news.example.com/1.jpg" type="image/jpeg"/>
  </item>
  <item>
    <title>No date</title>
    <link>https://news.example.com/2</link>
  </item>
  <item>
    <title>No link</title>
  </item>
  <item>
    <title>First again</title>
    <link>https://news.example.com/1#dup</link>
  </item>
</channel></rss>"#;

    #[test]
    fn test_rss_body() {
        let entries = feed(10).parse_body(RSS, now()).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].title, "First");
        assert_eq!(entries[0].summary, "Summary one");
        assert_eq!(entries[0].created_at, "2025-01-02 03:04:05");
        assert_eq!(entries[0].image.as_deref(), Some("https://news.example.com/1.jpg"));
        assert_eq!(entries[0].source, "example");

        assert_eq!(entries[1].created_at, "2025-01-10 08:00:00");
        assert_eq!(entries[1].image, None);
    }

    #[test]
    fn test_json_body_with_aliases() {
        let body = json!({
            "articles": [
                {"headline": "H1", "link": "https://j.example/1", "abstract": "a".repeat(600), "publish_time": "2025-01-05T10:00:00+08:00", "thumbnail": "https://j.example/1.png"},
                {"name": "N2", "sourceUrl": "https://j.example/2", "date": 1736035200},
                {"title": "Missing URL"},
                "not an object",
                {"title": "T4", "url": "https://j.example/4", "created_at": "whenever"}
            ]
        })
        .to_string();

        let entries = feed(10).parse_body(&body, now()).unwrap();
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["H1", "N2", "T4"]);

        assert_eq!(entries[0].summary.chars().count(), SUMMARY_CHARS);
        assert_eq!(entries[0].created_at, "2025-01-05 02:00:00");
        assert_eq!(entries[0].image.as_deref(), Some("https://j.example/1.png"));
        assert_eq!(entries[1].created_at, "2025-01-05 00:00:00");
        assert_eq!(entries[2].created_at, "2025-01-10 08:00:00");
        assert!(entries.iter().all(|e| e.kind == EntryKind::News));
    }

    #[test]
    fn test_json_top_level_array_and_limit() {
        let body = json!([
            {"title": "a", "url": "https://j.example/a"},
            {"title": "b", "url": "https://j.example/b"},
            {"title": "c", "url": "https://j.example/c"}
        ])
        .to_string();
        let entries = feed(2).parse_body(&body, now()).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_json_feed_goes_through_alias_tables() {
        let body = json!({
            "version": "https://jsonfeed.org/version/1.1",
            "title": "Example",
            "items": [
                {"id": "1", "title": "JF", "url": "https://jf.example/1", "content_text": "hi", "date_published": "2025-01-03T00:00:00Z"}
            ]
        })
        .to_string();
        let entries = feed(5).parse_body(&body, now()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].summary, "hi");
        assert_eq!(entries[0].created_at, "2025-01-03 00:00:00");
    }

    #[test]
    fn test_json_without_item_list_is_empty() {
        let entries = feed(5).parse_body(r#"{"status": "ok"}"#, now()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_unparseable_body() {
        let err = feed(5).parse_body("<<< definitely not", now()).unwrap_err();
        assert!(matches!(err, SourceError::Unparseable { .. }));
    }

    #[tokio::test]
    async fn test_fetch_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
            .mount(&server)
            .await;

        let source = CustomFeed::new(Client::new(), server.uri(), "mock", 1);
        let entries = source.fetch().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, "mock");
    }
}
