//! Utility functions for string shaping, URL handling, and file system checks.
//!
//! - Character-safe truncation for summaries and log previews
//! - URL identity keys and file extensions
//! - Output path derivation and writable-directory probing

use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};
use url::Url;

/// Preview of a possibly long payload (model replies, response bodies) for
/// log lines: the first `max` characters plus a count of the dropped bytes.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}

/// Take at most `max` characters, never splitting a UTF-8 sequence.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate to `max` characters and append `...` when something was cut.
pub fn ellipsize(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() < s.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized identity key for a URL.
///
/// Parsing lowercases the scheme and host; the fragment and a trailing slash
/// are dropped. Unparseable input falls back to the trimmed string.
pub fn identity_key(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => trimmed.trim_end_matches('/').to_string(),
    }
}

/// File extension (with the dot) of a URL's path, or `default`.
///
/// Query strings and fragments are ignored, so
/// `https://x/a.png?w=200` yields `.png`.
pub fn extension_from_url(raw: &str, default: &str) -> String {
    let path = Url::parse(raw)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| raw.to_string());
    let file = path.rsplit('/').next().unwrap_or("");
    match file.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < file.len() => file[idx..].to_string(),
        _ => default.to_string(),
    }
}

/// Path of the Markdown article written next to a JSON digest.
///
/// `out/ai_daily_news.json` becomes `out/ai_daily_news_article.md`; a path
/// without a `.json` suffix simply gets `_article.md` appended.
pub fn sibling_article_path(json_path: &Path) -> PathBuf {
    let s = json_path.to_string_lossy();
    match s.strip_suffix(".json") {
        Some(stem) => PathBuf::from(format!("{stem}_article.md")),
        None => PathBuf::from(format!("{s}_article.md")),
    }
}

const PROBE_FILE: &str = ".ai_daily_news_probe";

/// Create `path` if needed and prove it accepts new files.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe = path.join(PROBE_FILE);
    fs::write(&probe, b"").await?;
    fs::remove_file(&probe).await?;
    debug!("Directory is writable");
    Ok(())
}
