//! Hacker News stories via the Algolia search API.
//!
//! The search returns hits by relevance; we over-fetch (`limit * 20`), rank
//! by points, drop old stories and keep the top `limit`. Each kept story's
//! page is then visited once to pick up its `og:image`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{Source, get_text};
use crate::dates::format_timestamp;
use crate::error::{ItemMalformed, SourceError};
use crate::feed::strip_html;
use crate::images::ImageExtractor;
use crate::models::{Details, Entry, EntryKind};
use crate::utils::{ellipsize, identity_key};

pub const SEARCH_URL: &str = "https://hn.algolia.com/api/v1/search";
pub const SOURCE_TAG: &str = "hacker_news";

const TIMEOUT: Duration = Duration::from_secs(10);
const OVERFETCH: usize = 20;
const SUMMARY_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    points: Option<u64>,
    #[serde(default)]
    num_comments: Option<u64>,
    created_at_i: Option<i64>,
    story_text: Option<String>,
}

impl Hit {
    fn points(&self) -> u64 {
        self.points.unwrap_or(0)
    }

    /// Story URL, or the discussion page for text posts.
    fn link(&self) -> Option<String> {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Some(url.to_string()),
            _ => self
                .object_id
                .as_deref()
                .map(|id| format!("https://news.ycombinator.com/item?id={id}")),
        }
    }

    fn summary(&self) -> String {
        match self.story_text.as_deref().map(strip_html) {
            Some(text) if !text.is_empty() => ellipsize(&text, SUMMARY_CHARS),
            _ => format!(
                "{} points, {} comments",
                self.points(),
                self.num_comments.unwrap_or(0)
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HackerNews {
    client: reqwest::Client,
    endpoint: String,
    query: String,
    limit: usize,
    max_age_days: i64,
    timeout: Duration,
    og_images: Option<ImageExtractor>,
}

impl HackerNews {
    pub fn new(client: reqwest::Client, limit: usize) -> Self {
        Self {
            client,
            endpoint: SEARCH_URL.to_string(),
            query: "AI".to_string(),
            limit,
            max_age_days: 180,
            timeout: TIMEOUT,
            og_images: None,
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[cfg(test)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Hits requested per search; ranking and filtering keep `limit` of them.
    fn hits_per_page(&self) -> usize {
        self.limit.saturating_mul(OVERFETCH)
    }

    /// Look up each kept story's `og:image`.
    pub fn with_og_images(mut self, extractor: ImageExtractor) -> Self {
        self.og_images = Some(extractor);
        self
    }

    /// Rank, filter and normalize raw search hits.
    fn select(&self, hits: Vec<Value>, now: DateTime<Utc>) -> Vec<Entry> {
        let cutoff = now - ChronoDuration::days(self.max_age_days);

        let mut parsed: Vec<Hit> = hits
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Hit>(raw) {
                Ok(hit) => Some(hit),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable Hacker News hit");
                    None
                }
            })
            .collect();
        parsed.sort_by_key(|hit| Reverse(hit.points()));

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for hit in parsed {
            if entries.len() >= self.limit {
                break;
            }
            match normalize(&hit, now) {
                Ok(entry) => {
                    if !seen.insert(identity_key(&entry.url)) {
                        continue;
                    }
                    if hit.created_at_i.is_some_and(|ts| {
                        DateTime::from_timestamp(ts, 0).is_some_and(|dt| dt < cutoff)
                    }) {
                        debug!(url = %entry.url, "Story older than cutoff");
                        continue;
                    }
                    entries.push(entry);
                }
                Err(e) => warn!(error = %e, id = ?hit.object_id, "Skipping Hacker News hit"),
            }
        }
        entries
    }
}

fn normalize(hit: &Hit, now: DateTime<Utc>) -> Result<Entry, ItemMalformed> {
    let title = hit
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ItemMalformed::MissingField("title"))?;
    let url = hit.link().ok_or(ItemMalformed::MissingField("url"))?;
    let created = hit
        .created_at_i
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .unwrap_or(now);

    Ok(Entry {
        title: title.to_string(),
        url,
        summary: hit.summary(),
        source: SOURCE_TAG.to_string(),
        kind: EntryKind::News,
        created_at: format_timestamp(&created),
        image: None,
        images: Vec::new(),
        details: Details::News {
            points: Some(hit.points()),
        },
    })
}

impl Source for HackerNews {
    fn name(&self) -> &str {
        SOURCE_TAG
    }

    #[instrument(level = "info", skip_all, fields(limit = self.limit))]
    async fn try_fetch(&self) -> Result<Vec<Entry>, SourceError> {
        let hits_per_page = self.hits_per_page().to_string();
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("query", self.query.as_str()),
                ("tags", "story"),
                ("hitsPerPage", hits_per_page.as_str()),
            ])
            .timeout(self.timeout);
        let body = get_text(request, &self.endpoint).await?;
        let response: SearchResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Unparseable {
                url: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let mut entries = self.select(response.hits, Utc::now());

        if let Some(extractor) = &self.og_images {
            for entry in entries.iter_mut() {
                entry.image = extractor.og_image(&entry.url).await;
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hits(now: DateTime<Utc>) -> Vec<Value> {
        let recent = (now - ChronoDuration::hours(2)).timestamp();
        let old = (now - ChronoDuration::days(400)).timestamp();
        vec![
            json!({"objectID": "1", "title": "Low", "url": "https://a.example/low", "points": 5, "num_comments": 1, "created_at_i": recent}),
            json!({"objectID": "2", "title": "Top", "url": "https://a.example/top", "points": 500, "num_comments": 80, "created_at_i": recent}),
            json!({"objectID": "3", "title": "Old but popular", "url": "https://a.example/old", "points": 900, "created_at_i": old}),
            json!({"objectID": "4", "title": "Ask HN: text post", "url": null, "points": 50, "story_text": "<p>What do you <i>think</i>?</p>", "created_at_i": recent}),
            json!({"objectID": "5", "title": "Dup of top", "url": "https://a.example/top/", "points": 400, "created_at_i": recent}),
            json!({"objectID": "6", "url": "https://a.example/untitled", "points": 300, "created_at_i": recent}),
            json!("not an object"),
        ]
    }

    #[test]
    fn test_select_ranks_filters_and_dedupes() {
        let now = Utc::now();
        let source = HackerNews::new(Client::new(), 10);
        let entries = source.select(hits(now), now);

        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Top", "Ask HN: text post", "Low"]);

        assert_eq!(entries[0].summary, "500 points, 80 comments");
        assert_eq!(entries[0].details, Details::News { points: Some(500) });
        assert_eq!(entries[1].url, "https://news.ycombinator.com/item?id=4");
        assert_eq!(entries[1].summary, "What do you think ?");
        assert!(entries.iter().all(|e| e.kind == EntryKind::News));
    }

    #[test]
    fn test_select_caps_at_limit() {
        let now = Utc::now();
        let source = HackerNews::new(Client::new(), 1);
        let entries = source.select(hits(now), now);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Top");
    }

    #[tokio::test]
    async fn test_fetch_queries_algolia_and_reads_og_image() {
        let server = MockServer::start().await;
        let recent = (Utc::now() - ChronoDuration::hours(1)).timestamp();
        let story_url = format!("{}/story", server.uri());

        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .and(query_param("query", "AI"))
            .and(query_param("tags", "story"))
            .and(query_param("hitsPerPage", "40"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": [{"objectID": "9", "title": "Story", "url": story_url, "points": 42, "num_comments": 7, "created_at_i": recent}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><meta property="og:image" content="/cover.png"></head></html>"#,
            ))
            .mount(&server)
            .await;

        let client = Client::new();
        let source = HackerNews::new(client.clone(), 2)
            .with_endpoint(format!("{}/api/v1/search", server.uri()))
            .with_og_images(ImageExtractor::new(client, std::time::Duration::from_secs(5)));
        let entries = source.fetch().await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].summary, "42 points, 7 comments");
        assert_eq!(
            entries[0].image.as_deref(),
            Some(format!("{}/cover.png", server.uri()).as_str())
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HackerNews::new(Client::new(), 5).with_endpoint(server.uri());
        assert!(source.fetch().await.is_empty());
        assert!(matches!(
            source.try_fetch().await,
            Err(SourceError::Status { status: 503, .. })
        ));
    }

    #[test]
    fn test_hits_per_page_saturates() {
        assert_eq!(HackerNews::new(Client::new(), 8).hits_per_page(), 160);
        assert_eq!(HackerNews::new(Client::new(), usize::MAX).hits_per_page(), usize::MAX);
    }
}
