//! Upstream sources that produce normalized [`Entry`] lists.
//!
//! Every source follows the same contract:
//!
//! - [`Source::try_fetch`] does the work and reports a [`SourceError`] when
//!   the whole upstream call fails
//! - [`Source::fetch`] wraps it, logs the failure and returns an empty list,
//!   so one broken source never takes the pipeline down
//! - single malformed records are skipped with a warning inside `try_fetch`
//! - results are deduplicated on a normalized URL key and capped at the
//!   caller's limit
//!
//! # Sources
//!
//! | Source | Module | Format |
//! |--------|--------|--------|
//! | Hacker News | [`hacker_news`] | Algolia search JSON |
//! | ArXiv | [`arxiv`] | Atom feed |
//! | Custom URL | [`custom`] | RSS/Atom or JSON API |
//! | Domestic news pages | [`html`] | HTML link harvesting |
//!
//! [`github`] is not an entry source; it backs the `github-repos` command.

use reqwest::Client;
use std::time::Instant;
use tracing::{error, info};

use crate::error::{ConfigError, SourceError};
use crate::models::Entry;

pub mod arxiv;
pub mod custom;
pub mod github;
pub mod hacker_news;
pub mod html;

/// Browser-like agent; several news sites refuse the reqwest default.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Shared HTTP client. Timeouts are set per request by each caller.
pub fn http_client() -> Result<Client, ConfigError> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

pub trait Source {
    /// Origin tag used in logs.
    fn name(&self) -> &str;

    /// Fetch and normalize, failing when the upstream call as a whole fails.
    async fn try_fetch(&self) -> Result<Vec<Entry>, SourceError>;

    /// Fetch and normalize; failures are logged and yield no entries.
    async fn fetch(&self) -> Vec<Entry> {
        let t0 = Instant::now();
        match self.try_fetch().await {
            Ok(entries) => {
                info!(
                    source = %self.name(),
                    count = entries.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Fetched entries"
                );
                entries
            }
            Err(e) => {
                error!(source = %self.name(), error = %e, "Source unavailable; continuing without it");
                Vec::new()
            }
        }
    }
}

/// GET `url` and return the body, mapping transport and status failures.
pub(crate) async fn get_text(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<String, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::from_reqwest(url, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response
        .text()
        .await
        .map_err(|e| SourceError::from_reqwest(url, e))
}
