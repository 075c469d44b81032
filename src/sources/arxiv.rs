//! ArXiv papers from the export API's Atom feed.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{Source, get_text};
use crate::dates::format_timestamp;
use crate::error::{ItemMalformed, SourceError};
use crate::feed::{FeedItem, parse_feed};
use crate::images::ImageExtractor;
use crate::models::{DATE_FORMAT, Details, Entry, EntryKind};
use crate::utils::ellipsize;

pub const API_URL: &str = "http://export.arxiv.org/api/query";
pub const HTML_BASE: &str = "https://arxiv.org/html";
pub const SOURCE_TAG: &str = "arxiv";
pub const DEFAULT_QUERY: &str = "artificial intelligence OR machine learning";

const TIMEOUT: Duration = Duration::from_secs(15);
const SUMMARY_CHARS: usize = 300;
const RECENT_DAYS: i64 = 30;

static VERSION_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"v\d+$").expect("static regex"));

/// `http://arxiv.org/abs/2501.01234v2` -> `2501.01234`.
pub fn arxiv_id(raw_id: &str) -> Option<String> {
    let tail = raw_id
        .trim()
        .rsplit("/abs/")
        .next()?
        .trim_end_matches('/');
    let id = VERSION_SUFFIX.replace(tail, "");
    (!id.is_empty()).then(|| id.into_owned())
}

#[derive(Debug, Clone)]
pub struct Arxiv {
    client: reqwest::Client,
    endpoint: String,
    html_base: String,
    query: String,
    limit: usize,
    max_results: usize,
    target_date: Option<NaiveDate>,
    images: Option<ImageExtractor>,
}

impl Arxiv {
    pub fn new(client: reqwest::Client, limit: usize) -> Self {
        Self {
            client,
            endpoint: API_URL.to_string(),
            html_base: HTML_BASE.to_string(),
            query: DEFAULT_QUERY.to_string(),
            limit,
            max_results: 20,
            target_date: None,
            images: None,
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[cfg(test)]
    pub fn with_html_base(mut self, html_base: impl Into<String>) -> Self {
        self.html_base = html_base.into();
        self
    }

    /// Keep only papers published on this calendar day (UTC).
    pub fn with_target_date(mut self, date: Option<NaiveDate>) -> Self {
        self.target_date = date;
        self
    }

    /// Harvest figures from each kept paper's HTML rendering.
    pub fn with_images(mut self, extractor: ImageExtractor) -> Self {
        self.images = Some(extractor);
        self
    }

    fn is_wanted(&self, published: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.target_date {
            Some(day) => published.date_naive() == day,
            None => published >= now - ChronoDuration::days(RECENT_DAYS),
        }
    }

    /// Filter, dedupe and normalize feed entries, without images.
    fn select(&self, items: Vec<FeedItem>, now: DateTime<Utc>) -> Vec<Entry> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for item in items.into_iter().take(self.max_results) {
            if entries.len() >= self.limit {
                break;
            }
            let paper = match normalize(&item, now) {
                Ok(paper) => paper,
                Err(e) => {
                    warn!(error = %e, "Skipping ArXiv entry");
                    continue;
                }
            };
            if !seen.insert(paper.arxiv_id.clone()) {
                continue;
            }
            if !self.is_wanted(paper.published, now) {
                debug!(id = %paper.arxiv_id, "Paper outside date window");
                continue;
            }
            entries.push(paper.into_entry());
        }
        entries
    }

    fn html_url(&self, id: &str) -> String {
        format!("{}/{id}/", self.html_base.trim_end_matches('/'))
    }
}

struct Paper {
    arxiv_id: String,
    title: String,
    summary: String,
    authors: String,
    published: DateTime<Utc>,
}

impl Paper {
    fn into_entry(self) -> Entry {
        Entry {
            url: format!("https://arxiv.org/abs/{}", self.arxiv_id),
            title: self.title,
            summary: self.summary,
            source: SOURCE_TAG.to_string(),
            kind: EntryKind::Paper,
            created_at: format_timestamp(&self.published),
            image: None,
            images: Vec::new(),
            details: Details::Paper {
                authors: self.authors,
                arxiv_id: self.arxiv_id,
                published: self.published.format(DATE_FORMAT).to_string(),
            },
        }
    }
}

fn normalize(item: &FeedItem, now: DateTime<Utc>) -> Result<Paper, ItemMalformed> {
    let arxiv_id = item
        .id
        .as_deref()
        .and_then(arxiv_id)
        .ok_or(ItemMalformed::MissingField("id"))?;
    let title = item
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or(ItemMalformed::MissingField("title"))?;
    let published = item.published.unwrap_or(now);

    Ok(Paper {
        arxiv_id,
        title,
        summary: ellipsize(&item.plain_summary(), SUMMARY_CHARS),
        authors: item.authors.join(", "),
        published,
    })
}

impl Source for Arxiv {
    fn name(&self) -> &str {
        SOURCE_TAG
    }

    #[instrument(level = "info", skip_all, fields(limit = self.limit, target_date = ?self.target_date))]
    async fn try_fetch(&self) -> Result<Vec<Entry>, SourceError> {
        let search_query = format!("all:{}", self.query);
        let max_results = self.max_results.to_string();
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .timeout(TIMEOUT);
        let body = get_text(request, &self.endpoint).await?;
        let items = parse_feed(&body).map_err(|e| SourceError::Unparseable {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        let mut entries = self.select(items, Utc::now());

        if let Some(extractor) = &self.images {
            for entry in entries.iter_mut() {
                if let Details::Paper { arxiv_id, .. } = &entry.details {
                    entry.images = extractor.extract_images(&self.html_url(arxiv_id)).await;
                }
            }
        }
        Ok(entries)
    }
}
