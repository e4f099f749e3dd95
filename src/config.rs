//! Runtime configuration.
//!
//! Credentials and endpoints are resolved once into a [`Config`] value and
//! handed to each component when it is built. Nothing below this module
//! reads the process environment.

use std::path::PathBuf;

/// Default model for the reasoning service.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

pub const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_ITUNES_BASE: &str = "https://itunes.apple.com";
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Everything the pipeline needs to talk to its upstream services.
#[derive(Clone)]
pub struct Config {
    /// Bearer token for the primary catalog. `None` skips the primary lookup.
    pub tmdb_token: Option<String>,
    /// Bearer token for the reasoning service. `None` forces the fallback path.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub tmdb_base_url: String,
    pub itunes_base_url: String,
    pub openai_base_url: String,
    /// JSON-lines file receiving diagnostics events.
    pub diagnostics_path: PathBuf,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("tmdb_token", &self.tmdb_token.as_ref().map(|_| "<redacted>"))
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("openai_model", &self.openai_model)
            .field("tmdb_base_url", &self.tmdb_base_url)
            .field("itunes_base_url", &self.itunes_base_url)
            .field("openai_base_url", &self.openai_base_url)
            .field("diagnostics_path", &self.diagnostics_path)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmdb_token: None,
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            tmdb_base_url: DEFAULT_TMDB_BASE.to_string(),
            itunes_base_url: DEFAULT_ITUNES_BASE.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE.to_string(),
            diagnostics_path: default_diagnostics_path(),
        }
    }
}

impl Config {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();
        Self {
            tmdb_token: get("TMDB_READ_TOKEN"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("WATCH_CHECK_MODEL").unwrap_or(defaults.openai_model),
            tmdb_base_url: get("TMDB_API_BASE")
                .map(trim_trailing_slash)
                .unwrap_or(defaults.tmdb_base_url),
            itunes_base_url: get("ITUNES_API_BASE")
                .map(trim_trailing_slash)
                .unwrap_or(defaults.itunes_base_url),
            openai_base_url: get("OPENAI_API_BASE")
                .map(trim_trailing_slash)
                .unwrap_or(defaults.openai_base_url),
            diagnostics_path: get("WATCH_CHECK_DIAGNOSTICS_LOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.diagnostics_path),
        }
    }
}

/// Default diagnostics log location under the user's local data directory.
pub fn default_diagnostics_path() -> PathBuf {
    let data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    data_dir.join("watch-check").join("diagnostics.jsonl")
}

fn trim_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
