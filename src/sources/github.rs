//! GitHub repository search with README retrieval.
//!
//! Backs the `github-repos` command: search repositories created within a
//! date range, then fetch and decode each one's README.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::error::SourceError;
use crate::models::{RepoInfo, SearchParams};

pub const API_URL: &str = "https://api.github.com";

const TIMEOUT: Duration = Duration::from_secs(30);
const MAX_PER_PAGE: usize = 100;
const ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RepoItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct RepoItem {
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    language: Option<String>,
    #[serde(default)]
    html_url: String,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl RepoItem {
    fn into_info(self, readme: Option<String>) -> RepoInfo {
        RepoInfo {
            name: self.full_name,
            description: self.description.unwrap_or_default(),
            stars: self.stargazers_count,
            forks: self.forks_count,
            language: self.language.unwrap_or_else(|| "Unknown".to_string()),
            url: self.html_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
            readme: readme.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReadmeResponse {
    #[serde(default)]
    content: String,
}

/// The search qualifier string: `created:{start}..{end} {query}`.
pub fn search_query(params: &SearchParams) -> String {
    let range = format!("created:{}..{}", params.start_date, params.end_date);
    match params.query.trim() {
        "" => range,
        q => format!("{range} {q}"),
    }
}

/// Decode the API's newline-wrapped base64 README body.
///
/// Invalid UTF-8 sequences are replaced rather than failing the whole file.
pub fn decode_readme(content: &str) -> Result<String, base64::DecodeError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Debug, Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl GithubClient {
    pub fn new(client: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            client,
            api_base: API_URL.to_string(),
            token: token.into(),
        }
    }

    #[cfg(test)]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .timeout(TIMEOUT)
    }

    #[instrument(level = "info", skip_all, fields(query = %search_query(params)))]
    async fn search(&self, params: &SearchParams) -> Result<Vec<RepoItem>, SourceError> {
        let url = format!(
            "{}/search/repositories?q={}&sort={}&order=desc&per_page={}",
            self.api_base,
            urlencoding::encode(&search_query(params)),
            urlencoding::encode(&params.sort),
            params.limit.min(MAX_PER_PAGE),
        );
        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(&url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::from_reqwest(&url, e))?;
        if status.as_u16() >= 400 {
            let hint = if status == StatusCode::FORBIDDEN {
                " (possibly rate limited; check the token)"
            } else {
                ""
            };
            return Err(SourceError::Github(format!(
                "search failed with HTTP {}{hint}: {body}",
                status.as_u16()
            )));
        }

        let payload: Value = serde_json::from_str(&body).map_err(|e| SourceError::Unparseable {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        if let (Some(message), Some(_)) = (payload.get("message"), payload.get("documentation_url")) {
            return Err(SourceError::Github(
                message.as_str().unwrap_or_default().to_string(),
            ));
        }
        let parsed: SearchResponse =
            serde_json::from_value(payload).map_err(|e| SourceError::Unparseable {
                url,
                reason: e.to_string(),
            })?;
        info!(count = parsed.items.len(), "Repository search returned");
        Ok(parsed.items)
    }

    /// The decoded README of `owner/repo`, or `None` if absent or unreadable.
    #[instrument(level = "info", skip(self))]
    pub async fn readme(&self, full_name: &str) -> Option<String> {
        let url = format!("{}/repos/{full_name}/readme", self.api_base);
        let response = match self.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "README request failed");
                return None;
            }
        };

        match response.status() {
            StatusCode::NOT_FOUND => return None,
            status if status.as_u16() >= 400 => {
                warn!(status = status.as_u16(), "README request rejected");
                return None;
            }
            _ => {}
        }

        let readme = match response.json::<ReadmeResponse>().await {
            Ok(readme) => readme,
            Err(e) => {
                warn!(error = %e, "Unreadable README response");
                return None;
            }
        };
        if readme.content.is_empty() {
            return None;
        }
        match decode_readme(&readme.content) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "README is not valid base64");
                None
            }
        }
    }

    /// Search, then fetch every result's README in order.
    ///
    /// A failed search is an error; README failures only leave that repo's
    /// `readme` empty.
    pub async fn collect(&self, params: &SearchParams) -> Result<Vec<RepoInfo>, SourceError> {
        let items = self.search(params).await?;
        let total = items.len();
        let mut repos = Vec::with_capacity(total);
        for (i, item) in items.into_iter().enumerate() {
            info!(index = i + 1, total, repo = %item.full_name, "Fetching README");
            let readme = self.readme(&item.full_name).await;
            repos.push(item.into_info(readme));
        }
        Ok(repos)
    }
}
