//! Output generation for JSON documents and Markdown articles.
//!
//! # Submodules
//!
//! - [`json`]: the daily digest, JSON `ask` replies, repository search results
//! - [`markdown`]: the daily article and Markdown `ask` replies
//!
//! # Output Structure
//!
//! ```text
//! ai_daily_news.json          # DailyDigest (--output)
//! ai_daily_news_article.md    # generated article, next to the JSON
//! images/
//! ├── 01_1.jpg                # entry 1, image 1
//! ├── 02_1.png
//! └── 02_2.png
//! ```

pub mod json;
pub mod markdown;

use clap::ValueEnum;

/// Output format of the `ask` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReplyFormat {
    #[default]
    Json,
    Markdown,
}
