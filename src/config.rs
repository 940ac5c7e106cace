//! Runtime settings from the environment.

use crate::error::{RenderError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Operator credential for the generation provider.
pub const API_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";
/// Provider base URL override.
pub const API_BASE_ENV: &str = "REPLICATE_API_BASE";
/// Directory holding the persisted mapping and remembered key.
pub const DATA_DIR_ENV: &str = "RENDER_TOOL_DATA_DIR";
/// Server bind address.
pub const BIND_ENV: &str = "RENDER_TOOL_BIND";
/// Caller-side timeout for one generation, in seconds.
pub const TIMEOUT_ENV: &str = "RENDER_TOOL_TIMEOUT_SECS";

const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Process-wide settings, read once at startup and passed down explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Operator API token; takes precedence over user-supplied tokens.
    pub api_token: Option<String>,
    /// Provider base URL.
    pub api_base: Option<String>,
    /// Persistence directory.
    pub data_dir: PathBuf,
    /// Server bind address.
    pub bind: SocketAddr,
    /// Optional bound on a single generation.
    pub timeout: Option<Duration>,
}

impl Settings {
    /// Loads `.env.local` and `.env` (if present) into the environment, then
    /// reads settings from it.
    pub fn load() -> Result<Self> {
        for file in [".env.local", ".env"] {
            match dotenvy::from_filename(file) {
                Ok(path) => tracing::debug!(path = %path.display(), "loaded environment file"),
                Err(e) if e.not_found() => {}
                Err(e) => tracing::warn!("failed to load {file}: {e}"),
            }
        }
        Self::from_env()
    }

    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind = get(BIND_ENV)
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| RenderError::InvalidRequest(format!("{BIND_ENV}: {e}")))?;

        let timeout = get(TIMEOUT_ENV)
            .map(|v| {
                v.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| RenderError::InvalidRequest(format!("{TIMEOUT_ENV}: {e}")))
            })
            .transpose()?;

        Ok(Self {
            api_token: get(API_TOKEN_ENV),
            api_base: get(API_BASE_ENV),
            data_dir: get(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            bind,
            timeout,
        })
    }
}

/// Platform data directory for the tool, or `./.render-tool` if there is none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("render-tool"))
        .unwrap_or_else(|| PathBuf::from(".render-tool"))
}
