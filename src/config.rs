//! Client configuration, layered file → environment → defaults.
//!
//! Settings are read from `kanbanize.toml` (next to the working directory, or
//! under the user config dir) and overridden by `KANBANIZE_*` environment
//! variables. Only the external endpoints and the session-cache location are
//! configurable; synchronization cadences (the 30-second poll, the 500 ms
//! progress debounce) are part of the client contract and fixed in code.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//!
//! [identity]
//! base_url = "https://identitytoolkit.googleapis.com"
//! token_url = "https://securetoken.googleapis.com"
//! api_key = "AIza..."
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com";

/// Runtime configuration for the Kanbanize client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Kanbanize REST API.
    pub api_base_url: String,
    /// Base URL of the identity provider's account endpoints.
    pub identity_url: String,
    /// Base URL of the identity provider's token-refresh endpoint.
    pub token_url: String,
    /// Identity provider API key, appended to every provider call.
    pub api_key: String,
    /// Where the signed-in session is cached between runs.
    pub session_file: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    api: ApiSection,
    #[serde(default)]
    identity: IdentitySection,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IdentitySection {
    base_url: Option<String>,
    token_url: Option<String>,
    api_key: Option<String>,
}

impl Config {
    /// Load configuration: explicit path if given, otherwise `kanbanize.toml`
    /// in the working directory, otherwise the user config dir, otherwise
    /// defaults. Environment variables win over everything.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match Self::find_config_file(explicit) {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str::<FileConfig>(&raw)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => FileConfig::default(),
        };

        let api_base_url = std::env::var("KANBANIZE_API_URL")
            .ok()
            .or(file.api.base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let identity_url = std::env::var("KANBANIZE_IDENTITY_URL")
            .ok()
            .or(file.identity.base_url)
            .unwrap_or_else(|| DEFAULT_IDENTITY_URL.to_string());
        let token_url = std::env::var("KANBANIZE_TOKEN_URL")
            .ok()
            .or(file.identity.token_url)
            .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string());
        let api_key = std::env::var("KANBANIZE_API_KEY")
            .ok()
            .or(file.identity.api_key)
            .unwrap_or_default();

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            identity_url: identity_url.trim_end_matches('/').to_string(),
            token_url: token_url.trim_end_matches('/').to_string(),
            api_key,
            session_file: Self::default_session_file(),
        })
    }

    fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from("kanbanize.toml");
        if local.exists() {
            return Some(local);
        }
        let user = dirs::config_dir()?.join("kanbanize").join("kanbanize.toml");
        user.exists().then_some(user)
    }

    fn default_session_file() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kanbanize")
            .join("session.json")
    }
}
