//! Content-image discovery in HTML documents.
//!
//! Papers rendered as HTML carry dozens of `<img>` tags, most of them
//! formula renderings and icons. [`select_images`] keeps the ones that look
//! like figures: fetchable, not on the blocklist, and not tiny.

use itertools::Itertools;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::SourceError;
use crate::sources::get_text;

/// At most this many images are returned per document.
pub const MAX_IMAGES: usize = 5;

/// Images whose declared width or height is below this are decorations.
pub const MIN_DIMENSION: u32 = 200;

/// Substrings that mark formula renderings and icon assets.
pub const BLOCKLIST: &[&str] = &["formula", "inline", "math", "tex", "equation", "icon"];

static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("static selector"));
static OG_IMAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"], meta[name="og:image"]"#)
        .expect("static selector")
});

/// Resolve an `src`/`content` value against the document URL.
///
/// Protocol-relative references get `https:`; only http(s) results are kept.
pub fn resolve_reference(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }
    let resolved = if raw.starts_with("//") {
        Url::parse(&format!("https:{raw}")).ok()?
    } else {
        base.join(raw).ok()?
    };
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

fn is_blocked(s: &str) -> bool {
    let lower = s.to_lowercase();
    BLOCKLIST.iter().any(|kw| lower.contains(kw))
}

/// Declared pixel size from `primary`, falling back to `fallback`; 0 when unknown.
fn dimension(img: &ElementRef<'_>, primary: &str, fallback: &str) -> u32 {
    let parse = |name: &str| {
        img.value()
            .attr(name)
            .map(|v| v.trim().trim_end_matches("px"))
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0)
    };
    match parse(primary) {
        0 => parse(fallback),
        n => n,
    }
}

/// Pick candidate content images from an HTML document.
///
/// Rejects data-URIs, blocklisted paths and images whose declared width and
/// height are both present with either one under [`MIN_DIMENSION`]. Images
/// without size metadata are accepted. Returns at most [`MAX_IMAGES`] unique
/// absolute URLs in document order.
pub fn select_images(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&IMG)
        .filter_map(|img| {
            let src = img.value().attr("src")?;
            if src.trim_start().starts_with("data:") || is_blocked(src) {
                return None;
            }
            let url = resolve_reference(src, base)?;
            if is_blocked(url.path()) {
                return None;
            }
            let width = dimension(&img, "width", "data-width");
            let height = dimension(&img, "height", "data-height");
            if width > 0 && height > 0 && (width < MIN_DIMENSION || height < MIN_DIMENSION) {
                debug!(%url, width, height, "Skipping small image");
                return None;
            }
            Some(url.to_string())
        })
        .unique()
        .take(MAX_IMAGES)
        .collect()
}

/// The `og:image` of a page, resolved to an absolute URL.
pub fn find_og_image(html: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&OG_IMAGE)
        .filter_map(|meta| meta.value().attr("content"))
        .find_map(|content| resolve_reference(content, base))
        .map(|u| u.to_string())
}

/// Fetches documents and runs the image heuristics on them.
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    client: Client,
    timeout: Duration,
}

impl ImageExtractor {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn fetch_html(&self, url: &str) -> Result<String, SourceError> {
        get_text(self.client.get(url).timeout(self.timeout), url).await
    }

    /// Candidate figure URLs from the document at `document_url`.
    ///
    /// Never fails: retrieval or parse errors are logged and yield an empty list.
    #[instrument(level = "info", skip(self))]
    pub async fn extract_images(&self, document_url: &str) -> Vec<String> {
        let base = match Url::parse(document_url) {
            Ok(base) => base,
            Err(e) => {
                warn!(error = %e, "Invalid document URL; no images extracted");
                return Vec::new();
            }
        };
        match self.fetch_html(document_url).await {
            Ok(html) => {
                let images = select_images(&html, &base);
                info!(count = images.len(), "Extracted document images");
                images
            }
            Err(e) => {
                warn!(error = %e, "Could not extract images");
                Vec::new()
            }
        }
    }

    /// The page's `og:image`, if the page loads and declares one.
    #[instrument(level = "debug", skip(self))]
    pub async fn og_image(&self, page_url: &str) -> Option<String> {
        let base = Url::parse(page_url).ok()?;
        match self.fetch_html(page_url).await {
            Ok(html) => find_og_image(&html, &base),
            Err(e) => {
                debug!(error = %e, "No og:image");
                None
            }
        }
    }
}
