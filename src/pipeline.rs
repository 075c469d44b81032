//! The `daily` run: fetch, merge, optionally download images, write the
//! digest, optionally write the article.
//!
//! Sources are awaited one after another in priority order (Hacker News,
//! ArXiv, custom feed, domestic page). A failing source contributes nothing;
//! only output I/O errors abort the run.

use chrono::{Local, NaiveDate};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

use crate::aggregator::merge;
use crate::article::ArticleGenerator;
use crate::images::download::ImageGroup;
use crate::images::{ImageDownloader, ImageExtractor};
use crate::llm::AskAsync;
use crate::models::{DATE_FORMAT, DailyDigest, Entry};
use crate::outputs::{json, markdown};
use crate::sources::arxiv::Arxiv;
use crate::sources::custom::CustomFeed;
use crate::sources::hacker_news::HackerNews;
use crate::sources::html::{DomesticSource, HtmlSource};
use crate::sources::Source;
use crate::utils::{ensure_writable_dir, sibling_article_path};

/// Page fetches for `og:image` lookups.
const OG_IMAGE_TIMEOUT: Duration = Duration::from_secs(5);
/// ArXiv HTML renderings for figure extraction.
const FIGURE_PAGE_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-image timeout for `daily --download-images`.
pub const DAILY_IMAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct CustomSourceOptions {
    pub url: String,
    pub name: String,
    pub limit: usize,
}

/// What a `daily` run fetches and where it writes.
#[derive(Debug, Clone)]
pub struct DailyOptions {
    pub date: Option<NaiveDate>,
    pub hacker_news: bool,
    pub hn_limit: usize,
    pub arxiv: bool,
    pub arxiv_limit: usize,
    pub custom: Option<CustomSourceOptions>,
    pub domestic: Option<(DomesticSource, usize)>,
    pub output: PathBuf,
    pub image_dir: PathBuf,
    pub download_images: bool,
}

impl DailyOptions {
    /// `--date`, or today's local date.
    pub fn date_label(&self) -> String {
        self.date
            .unwrap_or_else(|| Local::now().date_naive())
            .format(DATE_FORMAT)
            .to_string()
    }
}

/// The configured sources of one run, in priority order.
#[derive(Debug, Clone, Default)]
pub struct DailySources {
    pub hacker_news: Option<HackerNews>,
    pub arxiv: Option<Arxiv>,
    pub custom: Option<CustomFeed>,
    pub domestic: Option<HtmlSource>,
}

impl DailySources {
    pub fn from_options(client: &reqwest::Client, opts: &DailyOptions) -> Self {
        let hacker_news = opts.hacker_news.then(|| {
            HackerNews::new(client.clone(), opts.hn_limit)
                .with_og_images(ImageExtractor::new(client.clone(), OG_IMAGE_TIMEOUT))
        });
        let arxiv = opts.arxiv.then(|| {
            Arxiv::new(client.clone(), opts.arxiv_limit)
                .with_target_date(opts.date)
                .with_images(ImageExtractor::new(client.clone(), FIGURE_PAGE_TIMEOUT))
        });
        let custom = opts
            .custom
            .as_ref()
            .map(|c| CustomFeed::new(client.clone(), c.url.clone(), c.name.clone(), c.limit));
        let domestic = opts
            .domestic
            .map(|(source, limit)| HtmlSource::predefined(client.clone(), source, limit));
        Self {
            hacker_news,
            arxiv,
            custom,
            domestic,
        }
    }

    async fn fetch_optional<S: Source>(source: &Option<S>) -> Vec<Entry> {
        match source {
            Some(source) => source.fetch().await,
            None => Vec::new(),
        }
    }

    /// Fetch every configured source in priority order.
    pub async fn fetch_all(&self) -> Vec<Vec<Entry>> {
        vec![
            Self::fetch_optional(&self.hacker_news).await,
            Self::fetch_optional(&self.arxiv).await,
            Self::fetch_optional(&self.custom).await,
            Self::fetch_optional(&self.domestic).await,
        ]
    }
}

/// Run the daily pipeline and return the digest that was written.
///
/// `article` is `None` for `--no-article`. The article is written next to
/// the digest (`foo.json` -> `foo_article.md`).
#[instrument(level = "info", skip_all, fields(output = %opts.output.display()))]
pub async fn run_daily<A>(
    opts: &DailyOptions,
    sources: &DailySources,
    downloader: &ImageDownloader,
    article: Option<&ArticleGenerator<A>>,
) -> Result<DailyDigest, Box<dyn Error>>
where
    A: AskAsync<Response = String>,
{
    let t0 = Instant::now();
    if let Some(dir) = opts.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_writable_dir(dir).await?;
    }

    let lists = sources.fetch_all().await;
    let fetched: usize = lists.iter().map(Vec::len).sum();
    let entries = merge(lists);
    info!(fetched, kept = entries.len(), "Merged sources");

    if opts.download_images {
        download_entry_images(downloader, &entries, &opts.image_dir).await;
    }

    let date = opts.date_label();
    let digest = DailyDigest::new(date.clone(), entries);
    json::write_digest(&digest, &opts.output).await?;

    if let Some(generator) = article {
        let text = generator.generate(&digest.entries, &date).await;
        let article_path = sibling_article_path(&opts.output);
        markdown::write_markdown(&text, &article_path).await?;
    }

    info!(
        elapsed_ms = t0.elapsed().as_millis() as u64,
        total = digest.stats.total,
        "Daily run complete"
    );
    Ok(digest)
}

/// Download every entry's images; failures are logged, never fatal.
async fn download_entry_images(downloader: &ImageDownloader, entries: &[Entry], dir: &Path) {
    if let Err(e) = ensure_writable_dir(dir).await {
        error!(dir = %dir.display(), error = %e, "Image directory is not writable; skipping downloads");
        return;
    }
    let groups: Vec<ImageGroup> = entries.iter().map(ImageGroup::from).collect();
    let report = downloader.download_batch(&groups, dir).await;
    if report.failed > 0 {
        warn!(failed = report.failed, total = report.total(), "Continuing without some images");
    }
}
