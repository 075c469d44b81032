//! Error types for every stage of the pipeline.
//!
//! Each component owns one error enum. Fetchers and the article generator
//! recover from their own errors at their boundary (an empty result or a raw
//! data dump), so only [`ConfigError`], [`DownloadError`] tallies and the
//! standalone commands ever turn an error into a nonzero exit code.

use thiserror::Error;

/// Missing credentials or malformed arguments. Fatal, raised before any
/// network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing API key: pass --api-key or set {}", .env_vars.join(" / "))]
    MissingApiKey { env_vars: Vec<&'static str> },

    #[error("missing GitHub token: pass --token or set GITHUB_TOKEN")]
    MissingGithubToken,

    #[error("invalid date '{0}': expected YYYY-MM-DD or 'N days/weeks/months ago'")]
    InvalidDate(String),

    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseConfig {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// A source's upstream call failed or returned a payload we cannot read.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unparseable payload from {url}: {reason}")]
    Unparseable { url: String, reason: String },

    #[error("GitHub API error: {0}")]
    Github(String),
}

impl SourceError {
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            SourceError::Timeout {
                url: url.to_string(),
            }
        } else {
            SourceError::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// One record inside an otherwise good payload could not be normalized.
#[derive(Debug, Error)]
pub enum ItemMalformed {
    #[error("item is not a JSON object")]
    NotAnObject,

    #[error("item has no {0}")]
    MissingField(&'static str),
}

/// Why a downloaded response was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("not an image: content-type '{0}'")]
    ContentType(String),

    #[error("image too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("downloaded file is empty")]
    Empty,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download timed out: {url}")]
    Timeout { url: String },

    #[error("download failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("rejected {url}: {reason}")]
    Validation {
        url: String,
        reason: ValidationFailure,
    },

    #[error("failed to save {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            DownloadError::Timeout {
                url: url.to_string(),
            }
        } else {
            DownloadError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// The LLM call failed or returned nothing usable.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request to LLM endpoint timed out")]
    Timeout,

    #[error("LLM request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("LLM endpoint returned HTTP {status}: {body}")]
    Server { status: u16, body: String },

    #[error("LLM response contained no content")]
    EmptyResponse,
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Http(e)
        }
    }
}

/// A batch run finished with failures.
#[derive(Debug, Error)]
#[error("{failed} of {total} image downloads failed")]
pub struct BatchFailed {
    pub failed: usize,
    pub total: usize,
}
