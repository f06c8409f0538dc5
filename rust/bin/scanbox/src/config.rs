//! Client-side configuration.
//!
//! Reads/writes `~/.scanbox/config.toml`. A context names one collection
//! service (base URL + API key); `SCANBOX_API_URL` / `SCANBOX_API_KEY`
//! override whatever the current context says.

use std::path::{Path, PathBuf};

use scanbox_scan::FailurePolicy;
use serde::{Deserialize, Serialize};

pub const API_URL_ENV: &str = "SCANBOX_API_URL";
pub const API_KEY_ENV: &str = "SCANBOX_API_KEY";

/// A single context: one collection service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// Context name (e.g. "warehouse-a").
    pub name: String,

    /// Service base URL; submissions go to `{server}/scanid`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,

    /// Value of the `X-API-KEY` header.
    #[serde(rename = "api-key", default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
}

/// What the scan session does with its batch after a failed submission.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(rename = "clear-on-local-save", default)]
    pub clear_on_local_save: bool,

    #[serde(rename = "clear-on-decline", default)]
    pub clear_on_decline: bool,
}

impl From<SessionConfig> for FailurePolicy {
    fn from(s: SessionConfig) -> Self {
        FailurePolicy {
            clear_on_local_save: s.clear_on_local_save,
            clear_on_decline: s.clear_on_decline,
        }
    }
}

/// Client configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name of the currently active context.
    #[serde(rename = "current-context", default)]
    pub current_context: String,

    /// List of configured contexts.
    #[serde(default)]
    pub contexts: Vec<Context>,

    #[serde(default)]
    pub session: SessionConfig,
}

/// The resolved endpoint a submission goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub server: String,
    pub api_key: String,
}

impl Endpoint {
    /// No server; any submission through it fails.
    pub fn unset() -> Self {
        Self {
            server: String::new(),
            api_key: String::new(),
        }
    }
}

impl ClientConfig {
    /// Default config file path: ~/.scanbox/config.toml.
    pub fn default_path() -> PathBuf {
        scanbox_core::config::default_data_dir().join("config.toml")
    }

    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the currently active context, if any.
    pub fn current(&self) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == self.current_context)
    }

    /// Get a mutable reference to a context by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.iter_mut().find(|c| c.name == name)
    }

    /// Add or update a context.
    pub fn upsert_context(&mut self, ctx: Context) {
        if let Some(existing) = self.get_mut(&ctx.name) {
            *existing = ctx;
        } else {
            self.contexts.push(ctx);
        }
    }

    /// Remove a context by name. Returns true if it was found.
    pub fn remove_context(&mut self, name: &str) -> bool {
        let len = self.contexts.len();
        self.contexts.retain(|c| c.name != name);
        if self.current_context == name {
            self.current_context = String::new();
        }
        self.contexts.len() < len
    }

    /// Resolve the submission endpoint from the environment and current context.
    pub fn endpoint(&self) -> anyhow::Result<Endpoint> {
        resolve_endpoint(
            self.current(),
            std::env::var(API_URL_ENV).ok(),
            std::env::var(API_KEY_ENV).ok(),
        )
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.session.into()
    }
}

fn resolve_endpoint(
    ctx: Option<&Context>,
    env_url: Option<String>,
    env_key: Option<String>,
) -> anyhow::Result<Endpoint> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

    let server = non_empty(env_url)
        .or_else(|| ctx.map(|c| c.server.clone()).filter(|s| !s.is_empty()))
        .ok_or_else(|| match ctx {
            Some(c) => anyhow::anyhow!(
                "No server URL set for context \"{}\". Run `scanbox context set {} --server <url>`.",
                c.name,
                c.name
            ),
            None => anyhow::anyhow!(
                "No current context. Run `scanbox context create <name> --server <url>` or set {}.",
                API_URL_ENV
            ),
        })?;

    let api_key = non_empty(env_key)
        .or_else(|| ctx.map(|c| c.api_key.clone()))
        .unwrap_or_default();

    Ok(Endpoint { server, api_key })
}
