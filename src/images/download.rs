//! Image downloads with type and size validation.
//!
//! Every check that can be made from the response head (status,
//! `Content-Type`, `Content-Length`) runs before the file is created, so a
//! rejected response leaves nothing on disk. The byte cap is enforced again
//! while streaming for servers that omit `Content-Length`.

use futures::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, instrument, warn};

use crate::error::{BatchFailed, DownloadError, ValidationFailure};
use crate::models::Entry;
use crate::utils::{extension_from_url, truncate_chars};

/// Responses larger than this are rejected.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const WRITE_BUFFER: usize = 8 * 1024;

/// Extension used when an image URL's path has none.
const DEFAULT_EXTENSION: &str = ".png";

#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: Client,
    timeout: Duration,
    max_bytes: u64,
}

impl ImageDownloader {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            max_bytes: MAX_IMAGE_BYTES,
        }
    }

    #[cfg(test)]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Download `url` to `dest`, creating parent directories as needed.
    ///
    /// Returns the written path. On any failure after the file was created,
    /// the partial file is removed.
    #[instrument(level = "info", skip_all, fields(%url, dest = %dest.display()))]
    pub async fn download(&self, url: &str, dest: &Path) -> Result<PathBuf, DownloadError> {
        let reject = |reason| DownloadError::Validation {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(reject(ValidationFailure::Status(status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(reject(ValidationFailure::ContentType(content_type)));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_bytes {
                return Err(reject(ValidationFailure::TooLarge {
                    size: declared,
                    limit: self.max_bytes,
                }));
            }
        }

        let io_err = |source| DownloadError::Io {
            path: dest.display().to_string(),
            source,
        };
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let written = match self.stream_to_file(url, response, dest).await {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(dest).await;
                return Err(e);
            }
        };

        if written == 0 {
            let _ = fs::remove_file(dest).await;
            return Err(reject(ValidationFailure::Empty));
        }

        info!(bytes = written, "Saved image");
        Ok(dest.to_path_buf())
    }

    async fn stream_to_file(
        &self,
        url: &str,
        response: reqwest::Response,
        dest: &Path,
    ) -> Result<u64, DownloadError> {
        let io_err = |source| DownloadError::Io {
            path: dest.display().to_string(),
            source,
        };

        let file = fs::File::create(dest).await.map_err(io_err)?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER, file);
        let mut written: u64 = 0;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| DownloadError::from_reqwest(url, e))?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(DownloadError::Validation {
                    url: url.to_string(),
                    reason: ValidationFailure::TooLarge {
                        size: written,
                        limit: self.max_bytes,
                    },
                });
            }
            writer.write_all(&chunk).await.map_err(io_err)?;
        }
        writer.flush().await.map_err(io_err)?;

        Ok(written)
    }

    /// Download every image of every group into `out_dir`.
    ///
    /// Files are named `{group:02}_{n}{ext}` with 1-based indices. Failures
    /// are logged and counted; the batch always runs to completion.
    #[instrument(level = "info", skip_all, fields(out_dir = %out_dir.display(), groups = groups.len()))]
    pub async fn download_batch(&self, groups: &[ImageGroup], out_dir: &Path) -> BatchReport {
        let mut report = BatchReport::default();

        for (group_idx, group) in groups.iter().enumerate() {
            let group_idx = group_idx + 1;
            if group.urls.is_empty() {
                info!(index = group_idx, label = %group.label, "No images");
                continue;
            }
            info!(index = group_idx, label = %group.label, count = group.urls.len(), "Downloading entry images");

            for (image_idx, url) in group.urls.iter().enumerate() {
                let dest = out_dir.join(batch_file_name(group_idx, image_idx + 1, url));
                match self.download(url, &dest).await {
                    Ok(_) => report.succeeded += 1,
                    Err(e) => {
                        warn!(index = group_idx, image = image_idx + 1, error = %e, "Image download failed");
                        report.failed += 1;
                    }
                }
            }
        }

        if report.failed > 0 {
            error!(succeeded = report.succeeded, failed = report.failed, "Batch finished with failures");
        } else {
            info!(succeeded = report.succeeded, "Batch finished");
        }
        report
    }
}

/// Images belonging to one entry, with a label for log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGroup {
    pub label: String,
    pub urls: Vec<String>,
}

impl ImageGroup {
    fn labelled(source: &str, title: &str, urls: Vec<String>) -> Self {
        Self {
            label: format!("{source}: {}", truncate_chars(title, 50)),
            urls,
        }
    }
}

impl From<&Entry> for ImageGroup {
    fn from(entry: &Entry) -> Self {
        Self::labelled(&entry.source, &entry.title, entry.image_urls())
    }
}

/// Image groups from a daily JSON document: `{ "entries": [...] }` or a bare
/// array of entries.
///
/// Entries are read loosely: a blank `image` or a missing `images` list just
/// contributes no URLs. Returns `None` when no entry list can be found.
pub fn image_groups(document: &Value) -> Option<Vec<ImageGroup>> {
    let entries = match document {
        Value::Array(items) => items,
        Value::Object(map) => map.get("entries")?.as_array()?,
        _ => return None,
    };

    let groups = entries
        .iter()
        .map(|entry| {
            let str_field = |key: &str| entry.get(key).and_then(Value::as_str).unwrap_or_default();
            let single = entry
                .get("image")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string);
            let many = entry
                .get("images")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string);
            ImageGroup::labelled(
                str_field("source"),
                str_field("title"),
                single.into_iter().chain(many).collect(),
            )
        })
        .collect();
    Some(groups)
}

/// `{group:02}_{n}{ext}`, extension taken from the URL path.
pub fn batch_file_name(group_idx: usize, image_idx: usize, url: &str) -> String {
    format!(
        "{group_idx:02}_{image_idx}{}",
        extension_from_url(url, DEFAULT_EXTENSION)
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn into_result(self) -> Result<Self, BatchFailed> {
        if self.failed > 0 {
            Err(BatchFailed {
                failed: self.failed,
                total: self.total(),
            })
        } else {
            Ok(self)
        }
    }
}
