//! # AI Daily News
//!
//! Collects AI news and papers from Hacker News, ArXiv, custom feeds and
//! domestic news pages, merges them into one JSON digest and asks an
//! OpenAI-compatible LLM to write a Markdown article about the day.
//!
//! ## Features
//!
//! - `daily`: fetch, dedupe and sort entries, optionally download their
//!   images, write the digest and the article
//! - `download-image` / `download-images`: validated image downloads
//! - `ask`: one chat-completion call written as JSON or Markdown
//! - `github-repos`: recently created repositories with their READMEs
//!
//! ## Usage
//!
//! ```sh
//! ARK_API_KEY=... ai_daily_news daily -o out/ai_daily_news.json --download-images
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: each source produces normalized entries; a failing source
//!    contributes nothing
//! 2. **Merging**: entries are sorted newest first and deduplicated by URL
//! 3. **Images**: optional sequential downloads with type and size checks
//! 4. **Output**: the JSON digest, then the LLM article next to it

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod article;
mod cli;
mod config;
mod dates;
mod error;
mod feed;
mod fields;
mod images;
mod llm;
mod models;
mod outputs;
mod pipeline;
mod sources;
mod utils;

use article::ArticleGenerator;
use cli::{AskArgs, Cli, Command, DailyArgs, DownloadImageArgs, DownloadImagesArgs, GithubReposArgs, LlmArgs};
use config::{ConfigFile, LlmOverrides, LlmSettings, load_config};
use error::ConfigError;
use images::ImageDownloader;
use images::download::image_groups;
use llm::{ASSISTANT_PROMPT, AskAsync, ChatClient};
use models::{DATE_FORMAT, RepoSearchOutput, SearchParams};
use outputs::{ReplyFormat, json, markdown};
use pipeline::{DAILY_IMAGE_TIMEOUT, DailySources, run_daily};
use sources::github::GithubClient;
use sources::http_client;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let result = match args.command {
        Command::Daily(daily) => run_daily_command(daily).await,
        Command::DownloadImage(download) => download_image(download).await,
        Command::DownloadImages(batch) => download_images(batch).await,
        Command::Ask(ask) => ask_command(ask).await,
        Command::GithubRepos(repos) => github_repos(repos).await,
    };

    let elapsed = start_time.elapsed();
    match &result {
        Ok(()) => info!(?elapsed, secs = elapsed.as_secs(), "Execution complete"),
        Err(e) => error!(?elapsed, error = %e, "Execution failed"),
    }
    result
}

/// LLM settings from `--config` (if any), flags and the environment.
fn llm_settings(llm: &LlmArgs, overrides: LlmOverrides) -> Result<LlmSettings, ConfigError> {
    let file = match &llm.config {
        Some(path) => load_config(path)?,
        None => ConfigFile::default(),
    };
    LlmSettings::from_env(file, overrides)
}

#[instrument(level = "info", skip_all)]
async fn run_daily_command(args: DailyArgs) -> Result<(), Box<dyn Error>> {
    // Resolved before any network call so a missing key fails fast.
    let settings = if args.no_article {
        None
    } else {
        Some(llm_settings(&args.llm, args.llm.overrides())?)
    };

    let client = http_client()?;
    let opts = args.options();
    let sources = DailySources::from_options(&client, &opts);
    let downloader = ImageDownloader::new(client.clone(), DAILY_IMAGE_TIMEOUT);
    let generator = settings.map(|s| {
        info!(model = %s.model, api_base = %s.api_base, "Article generation enabled");
        ArticleGenerator::new(ChatClient::new(client.clone(), s))
    });

    let digest = run_daily(&opts, &sources, &downloader, generator.as_ref()).await?;
    info!(
        date = %digest.date,
        total = digest.stats.total,
        news = digest.stats.news,
        papers = digest.stats.papers,
        output = %opts.output.display(),
        "Digest written"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(url = %args.url))]
async fn download_image(args: DownloadImageArgs) -> Result<(), Box<dyn Error>> {
    let downloader = ImageDownloader::new(http_client()?, Duration::from_secs(args.timeout));
    let path = downloader.download(&args.url, &args.output).await?;
    info!(path = %path.display(), "Image saved");
    Ok(())
}

#[instrument(level = "info", skip_all, fields(input = %args.input.display()))]
async fn download_images(args: DownloadImagesArgs) -> Result<(), Box<dyn Error>> {
    let raw = tokio::fs::read_to_string(&args.input).await?;
    let document: serde_json::Value = serde_json::from_str(&raw)?;
    let groups = image_groups(&document)
        .ok_or_else(|| format!("{}: no entry list found", args.input.display()))?;

    let downloader = ImageDownloader::new(http_client()?, images::download::DEFAULT_TIMEOUT);
    let report = downloader.download_batch(&groups, &args.output).await;
    let report = report.into_result()?;
    info!(succeeded = report.succeeded, "All images downloaded");
    Ok(())
}

#[instrument(level = "info", skip_all, fields(format = ?args.format))]
async fn ask_command(args: AskArgs) -> Result<(), Box<dyn Error>> {
    let settings = llm_settings(&args.llm, args.overrides())?;
    let chat = ChatClient::new(http_client()?, settings);
    let reply = chat.ask(ASSISTANT_PROMPT, &args.prompt).await?;

    match args.format {
        ReplyFormat::Json => json::write_reply_json(&reply, &args.output).await?,
        ReplyFormat::Markdown => markdown::write_markdown(&reply, &args.output).await?,
    }
    info!(output = %args.output.display(), "Reply written");
    Ok(())
}

#[instrument(level = "info", skip_all, fields(query = %args.query))]
async fn github_repos(args: GithubReposArgs) -> Result<(), Box<dyn Error>> {
    let token = args
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or(ConfigError::MissingGithubToken)?;

    let today = Local::now().date_naive();
    let start = dates::resolve_date_arg(&args.start_date, today)?;
    let end = dates::resolve_date_arg(&args.end_date, today)?;
    let params = SearchParams {
        start_date: start.format(DATE_FORMAT).to_string(),
        end_date: end.format(DATE_FORMAT).to_string(),
        query: args.query,
        sort: args.sort.to_string(),
        limit: args.limit,
    };

    let github = GithubClient::new(http_client()?, token);
    let repos = github.collect(&params).await?;
    info!(count = repos.len(), "Collected repositories");

    let output = RepoSearchOutput::new(repos, params);
    println!("{}", json::render_repos(&output)?);
    Ok(())
}
