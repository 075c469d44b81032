//! LLM endpoint configuration.
//!
//! Settings are layered: built-in defaults, then an optional YAML file
//! (`--config`), then command-line flags. The API key additionally falls back
//! to the `ARK_API_KEY` and `OPENAI_API_KEY` environment variables.
//!
//! ```yaml
//! api_base: "https://ark.cn-beijing.volces.com/api/v3"
//! model: "doubao-seed-1-8-251228"
//! temperature: 0.7
//! max_tokens: 2000
//! timeout_secs: 120
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://ark.cn-beijing.volces.com/api/v3";
pub const DEFAULT_MODEL: &str = "doubao-seed-1-8-251228";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["ARK_API_KEY", "OPENAI_API_KEY"];

/// Contents of the YAML config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
        path: display.clone(),
        source,
    })?;
    let config: ConfigFile =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::ParseConfig {
            path: display,
            source,
        })?;
    info!("Loaded configuration");
    Ok(config)
}

/// Debug stand-in for an optional credential.
pub fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

/// Values given on the command line; `None` means "not given".
#[derive(Clone, Default)]
pub struct LlmOverrides {
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl fmt::Debug for LlmOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmOverrides")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Fully resolved endpoint settings handed to the chat client.
#[derive(Clone, PartialEq)]
pub struct LlmSettings {
    pub api_base: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmSettings {
    /// Layer `overrides` over `file` over the defaults.
    ///
    /// Key precedence: `--api-key`, then each of [`API_KEY_ENV_VARS`] via
    /// `env`, then the file. A missing or blank key is a [`ConfigError`].
    pub fn resolve(
        file: ConfigFile,
        overrides: LlmOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let api_key = non_blank(overrides.api_key)
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .find_map(|var| non_blank(env(var)))
            })
            .or_else(|| non_blank(file.api_key))
            .ok_or_else(|| ConfigError::MissingApiKey {
                env_vars: API_KEY_ENV_VARS.to_vec(),
            })?;

        Ok(Self {
            api_base: non_blank(overrides.api_base)
                .or(non_blank(file.api_base))
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: non_blank(overrides.model)
                .or(non_blank(file.model))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
            temperature: overrides
                .temperature
                .or(file.temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: overrides
                .max_tokens
                .or(file.max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }

    /// [`LlmSettings::resolve`] against the process environment.
    pub fn from_env(file: ConfigFile, overrides: LlmOverrides) -> Result<Self, ConfigError> {
        Self::resolve(file, overrides, |var| std::env::var(var).ok())
    }
}
