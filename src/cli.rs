//! Command-line interface definitions for AI Daily News.
//!
//! One binary, one subcommand per job. Credentials can be given as flags or
//! through environment variables.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::PathBuf;

use crate::config::{LlmOverrides, redact};
use crate::outputs::ReplyFormat;
use crate::pipeline::{CustomSourceOptions, DailyOptions};
use crate::sources::html::DomesticSource;

/// Command-line arguments for the AI Daily News application.
///
/// # Examples
///
/// ```sh
/// # Today's digest and article
/// ai_daily_news daily -o out/ai_daily_news.json
///
/// # A specific day, papers only, no article
/// ai_daily_news daily --date 2025-01-15 --no-hacker-news --no-article
///
/// # Trending repositories of the last week
/// ai_daily_news github-repos --start-date "7 days ago" --end-date "1 days ago"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, merge and write the daily digest (and article)
    Daily(DailyArgs),
    /// Download a single image with type and size validation
    DownloadImage(DownloadImageArgs),
    /// Download every image referenced by a daily JSON document
    DownloadImages(DownloadImagesArgs),
    /// Send one prompt to the chat-completion endpoint
    Ask(AskArgs),
    /// Search recently created GitHub repositories and fetch their READMEs
    GithubRepos(GithubReposArgs),
}

/// LLM endpoint flags shared by `daily` and `ask`.
#[derive(Args, Clone, Default)]
pub struct LlmArgs {
    /// Base URL of the OpenAI-compatible API
    #[arg(long, alias = "base_url")]
    pub base_url: Option<String>,

    /// Model name
    #[arg(long)]
    pub model: Option<String>,

    /// API key (falls back to ARK_API_KEY, then OPENAI_API_KEY)
    #[arg(long, alias = "api_key")]
    pub api_key: Option<String>,

    /// Optional path to a YAML config file with LLM defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DailyArgs {
    /// Target date, YYYY-MM-DD (default: today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// RSS/Atom or JSON feed to include
    #[arg(long)]
    pub custom_url: Option<String>,

    /// Source label for entries from --custom-url
    #[arg(long, default_value = "custom")]
    pub custom_source: String,

    #[arg(long, default_value_t = 5)]
    pub custom_limit: usize,

    /// Predefined domestic news page to scrape
    #[arg(long, value_enum)]
    pub domestic_source: Option<DomesticSource>,

    #[arg(long, default_value_t = 5)]
    pub domestic_limit: usize,

    #[arg(long)]
    pub no_hacker_news: bool,

    #[arg(long)]
    pub no_arxiv: bool,

    #[arg(long, default_value_t = 8)]
    pub hn_limit: usize,

    #[arg(long, default_value_t = 2)]
    pub arxiv_limit: usize,

    /// Output path of the JSON digest
    #[arg(short, long, default_value = "ai_daily_news.json")]
    pub output: PathBuf,

    /// Directory for --download-images
    #[arg(long, default_value = "./images")]
    pub image_output_dir: PathBuf,

    /// Download every entry's images
    #[arg(long)]
    pub download_images: bool,

    /// Skip the LLM article
    #[arg(long)]
    pub no_article: bool,

    #[command(flatten)]
    pub llm: LlmArgs,
}

impl DailyArgs {
    pub fn options(&self) -> DailyOptions {
        DailyOptions {
            date: self.date,
            hacker_news: !self.no_hacker_news,
            hn_limit: self.hn_limit,
            arxiv: !self.no_arxiv,
            arxiv_limit: self.arxiv_limit,
            custom: self.custom_url.as_ref().map(|url| CustomSourceOptions {
                url: url.clone(),
                name: self.custom_source.clone(),
                limit: self.custom_limit,
            }),
            domestic: self.domestic_source.map(|s| (s, self.domestic_limit)),
            output: self.output.clone(),
            image_dir: self.image_output_dir.clone(),
            download_images: self.download_images,
        }
    }
}

#[derive(Args, Debug)]
pub struct DownloadImageArgs {
    #[arg(long)]
    pub url: String,

    /// Local file to write
    #[arg(long)]
    pub output: PathBuf,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

#[derive(Args, Debug)]
pub struct DownloadImagesArgs {
    /// Daily JSON document to read image URLs from
    #[arg(long)]
    pub input: PathBuf,

    /// Output directory
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    #[arg(long)]
    pub prompt: String,

    /// Output file path
    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = ReplyFormat::Json)]
    pub format: ReplyFormat,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long, alias = "max_tokens")]
    pub max_tokens: Option<u32>,

    #[command(flatten)]
    pub llm: LlmArgs,
}

impl AskArgs {
    pub fn overrides(&self) -> LlmOverrides {
        LlmOverrides {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..self.llm.overrides()
        }
    }
}

impl fmt::Debug for LlmArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmArgs")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("config", &self.config)
            .finish()
    }
}

impl LlmArgs {
    pub fn overrides(&self) -> LlmOverrides {
        LlmOverrides {
            api_base: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            ..LlmOverrides::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RepoSort {
    #[default]
    Stars,
    Forks,
}

impl fmt::Display for RepoSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RepoSort::Stars => "stars",
            RepoSort::Forks => "forks",
        })
    }
}

#[derive(Args)]
pub struct GithubReposArgs {
    /// YYYY-MM-DD or a relative date such as "30 days ago"
    #[arg(long)]
    pub start_date: String,

    /// YYYY-MM-DD or a relative date such as "1 days ago"
    #[arg(long)]
    pub end_date: String,

    /// Extra search keywords
    #[arg(long, default_value = "")]
    pub query: String,

    #[arg(long, value_enum, default_value_t = RepoSort::Stars)]
    pub sort: RepoSort,

    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl fmt::Debug for GithubReposArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubReposArgs")
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("query", &self.query)
            .field("sort", &self.sort)
            .field("limit", &self.limit)
            .field("token", &redact(&self.token))
            .finish()
    }
}
