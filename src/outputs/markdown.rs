//! Markdown output: the daily article and `ask --format markdown` replies.
//!
//! Both are written verbatim; the model already produced Markdown.

use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write Markdown text to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_markdown(text: &str, path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    if let Err(e) = fs::write(path, text).await {
        error!(error = %e, "Failed writing Markdown");
        return Err(e.into());
    }
    info!(chars = text.chars().count(), "Wrote Markdown");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_markdown_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a/b/ai_daily_news_article.md");
        let text = "# 标题\n\n[Hacker News] Something happened.\n";
        write_markdown(text, &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    }
}
