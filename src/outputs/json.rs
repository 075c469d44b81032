//! JSON document output.
//!
//! - `daily` writes a [`DailyDigest`] to the `--output` path
//! - `ask --format json` writes the model's reply, pretty-printed when it
//!   parses as JSON
//! - `github-repos` prints a [`RepoSearchOutput`] to stdout
//!
//! Documents are pretty-printed with non-ASCII text kept as-is.

use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument, warn};

use crate::models::{DailyDigest, RepoSearchOutput};

/// Create the parent directory of `path` if it has one.
async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::create_dir_all(parent).await,
        None => Ok(()),
    }
}

async fn write_pretty<T: Serialize>(value: &T, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    if let Err(e) = ensure_parent(path).await {
        error!(path = %path.display(), error = %e, "Failed to create output dir");
        return Err(e.into());
    }
    fs::write(path, json).await?;
    Ok(())
}

/// Write the daily digest document.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_digest(digest: &DailyDigest, path: &Path) -> Result<(), Box<dyn Error>> {
    write_pretty(digest, path).await?;
    info!(
        total = digest.stats.total,
        news = digest.stats.news,
        papers = digest.stats.papers,
        "Wrote digest JSON"
    );
    Ok(())
}

/// Strip a fenced code block from a model reply.
///
/// A ` ```json ` fence wins over a bare ` ``` ` fence; text without a fence
/// is returned trimmed.
pub fn extract_fenced_block(reply: &str) -> &str {
    let body = if let Some((_, rest)) = reply.split_once("```json") {
        rest
    } else if let Some((_, rest)) = reply.split_once("```") {
        rest
    } else {
        return reply.trim();
    };
    body.split("```").next().unwrap_or(body).trim()
}

/// Write a model reply as JSON when it is JSON, otherwise verbatim.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_reply_json(reply: &str, path: &Path) -> Result<(), Box<dyn Error>> {
    let candidate = extract_fenced_block(reply);
    match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(value) => {
            write_pretty(&value, path).await?;
            info!("Wrote reply as JSON");
        }
        Err(e) => {
            warn!(error = %e, "Reply is not JSON; writing raw text");
            ensure_parent(path).await?;
            fs::write(path, reply).await?;
        }
    }
    Ok(())
}

/// Render the repository search result for stdout.
pub fn render_repos(output: &RepoSearchOutput) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{news, paper};
    use crate::models::{RepoInfo, SearchParams};

    #[test]
    fn test_extract_fenced_block() {
        assert_eq!(
            extract_fenced_block("Here:\n```json\n{\"a\": 1}\n```\nthanks"),
            "{\"a\": 1}"
        );
        assert_eq!(extract_fenced_block("```\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(extract_fenced_block("  {\"plain\": true} "), "{\"plain\": true}");
    }

    #[tokio::test]
    async fn test_write_digest_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out/daily.json");
        let digest = DailyDigest::new(
            "2025-01-02".to_string(),
            vec![
                news("https://n/1", "2025-01-02 00:00:00"),
                paper("https://p/1", "2025-01-01 00:00:00"),
            ],
        );
        write_digest(&digest, &path).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["stats"]["total"], 2);
        assert_eq!(written["entries"][1]["type"], "paper");
    }

    #[tokio::test]
    async fn test_write_reply_json_pretty_or_raw() {
        let tmp = tempfile::tempdir().unwrap();

        let json_path = tmp.path().join("r.json");
        write_reply_json("```json\n{\"picks\":[1,2]}\n```", &json_path)
            .await
            .unwrap();
        let text = std::fs::read_to_string(&json_path).unwrap();
        assert!(text.contains("\"picks\": ["));

        let raw_path = tmp.path().join("raw.json");
        write_reply_json("not json at all", &raw_path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&raw_path).unwrap(), "not json at all");
    }

    fn params() -> SearchParams {
        SearchParams {
            start_date: "2025-01-01".to_string(),
            end_date: "2025-01-31".to_string(),
            query: String::new(),
            sort: "stars".to_string(),
            limit: 20,
        }
    }

    #[test]
    fn test_render_repos_keeps_unicode() {
        let output = RepoSearchOutput::new(
            vec![RepoInfo {
                name: "a/b".to_string(),
                description: "中文描述".to_string(),
                stars: 1,
                forks: 0,
                language: "Rust".to_string(),
                url: "https://github.com/a/b".to_string(),
                created_at: None,
                updated_at: None,
                readme: String::new(),
            }],
            params(),
        );
        let rendered = render_repos(&output).unwrap();
        assert!(rendered.contains("中文描述"));
        assert!(rendered.contains("\"search_params\""));
    }

    #[test]
    fn test_render_empty_repos_omits_params() {
        let output = RepoSearchOutput::new(Vec::new(), params());
        let value: serde_json::Value = serde_json::from_str(&render_repos(&output).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"repos": []}));
    }
}
