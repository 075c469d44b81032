//! Data models for collected entries and the documents written to disk.
//!
//! - [`Entry`]: one normalized news item or paper, produced by a source
//! - [`DailyDigest`]: the JSON document written by the `daily` command
//! - [`RepoInfo`] / [`RepoSearchOutput`]: the `github-repos` output
//!
//! Field names follow the JSON layout consumers already read (`type`,
//! `created_at`, `arxiv_id`, ...), so the structs serialize without renames
//! except where Rust keywords get in the way.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Timestamp layout used for `created_at` and `generated_at`.
///
/// The aggregator sorts on the string form, so every source must emit this
/// exact layout for ordering to be chronological.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date layout used for `date` and paper `published` fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    News,
    Paper,
}

/// Fields that only make sense for one [`EntryKind`].
///
/// Keeping them in an enum means a news source cannot attach paper fields
/// and vice versa; the variant is flattened into the entry on output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Details {
    Paper {
        authors: String,
        arxiv_id: String,
        published: String,
    },
    News {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        points: Option<u64>,
    },
}

/// One normalized item flowing through the pipeline.
///
/// Entries are built once inside a source and never modified afterwards;
/// the aggregator only reorders and drops them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    /// Identity key for deduplication across sources.
    pub url: String,
    pub summary: String,
    /// Origin tag, e.g. `hacker_news`, `arxiv` or a custom source name.
    pub source: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(flatten)]
    pub details: Details,
}

impl Entry {
    /// Every image URL attached to this entry, single image first.
    pub fn image_urls(&self) -> Vec<String> {
        self.image
            .iter()
            .filter(|u| !u.trim().is_empty())
            .chain(self.images.iter())
            .cloned()
            .collect()
    }

    /// Author list for papers, empty for news.
    pub fn authors(&self) -> &str {
        match &self.details {
            Details::Paper { authors, .. } => authors,
            Details::News { .. } => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestStats {
    pub total: usize,
    pub news: usize,
    pub papers: usize,
}

/// The JSON document produced by one `daily` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyDigest {
    /// Target date (`--date`) or today, `YYYY-MM-DD`.
    pub date: String,
    pub generated_at: String,
    pub entries: Vec<Entry>,
    pub stats: DigestStats,
}

impl DailyDigest {
    pub fn new(date: String, entries: Vec<Entry>) -> Self {
        let news = entries.iter().filter(|e| e.kind == EntryKind::News).count();
        let papers = entries.iter().filter(|e| e.kind == EntryKind::Paper).count();
        Self {
            date,
            generated_at: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            stats: DigestStats {
                total: entries.len(),
                news,
                papers,
            },
            entries,
        }
    }
}

/// A GitHub repository with its decoded README.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub description: String,
    pub stars: u64,
    pub forks: u64,
    pub language: String,
    pub url: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub readme: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub start_date: String,
    pub end_date: String,
    pub query: String,
    pub sort: String,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSearchOutput {
    pub repos: Vec<RepoInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_params: Option<SearchParams>,
}

impl RepoSearchOutput {
    /// The parameters are echoed only when something was found.
    pub fn new(repos: Vec<RepoInfo>, params: SearchParams) -> Self {
        let search_params = (!repos.is_empty()).then_some(params);
        Self {
            repos,
            search_params,
        }
    }
}
