//! Runtime configuration.
//!
//! Layers, lowest to highest precedence: built-in defaults,
//! `config/default.toml`, environment variables (after `.env` is loaded),
//! then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use agentembed_agent::{CEREBRAS_BASE_URL, CEREBRAS_DEFAULT_MODEL, LlmClientConfig};
use agentembed_web::WebConfig;

/// Looked up when no `--config` is given. Missing is fine.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
    pub public_url: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
            public_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/agentembed.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self { ttl_secs: 1800 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: CEREBRAS_BASE_URL.into(),
            model: CEREBRAS_DEFAULT_MODEL.into(),
            timeout_secs: 60,
        }
    }
}

/// Everything the binary needs to run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub cache: CacheSection,
    pub upstream: UpstreamSection,
}

impl AppConfig {
    /// Load from `path` (or [`DEFAULT_CONFIG_PATH`]) and apply the process
    /// environment. An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides through `lookup`. Blank values are
    /// ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AGENTEMBED_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = get("AGENTEMBED_PORT") {
            self.server.port = v
                .trim()
                .parse()
                .with_context(|| format!("AGENTEMBED_PORT is not a port number: {v}"))?;
        }
        if let Some(v) = get("AGENTEMBED_PUBLIC_URL") {
            self.server.public_url = Some(v);
        }
        if let Some(v) = get("AGENTEMBED_DB") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = get("AGENTEMBED_CACHE_TTL_SECS") {
            self.cache.ttl_secs = v
                .trim()
                .parse()
                .with_context(|| format!("AGENTEMBED_CACHE_TTL_SECS is not a number: {v}"))?;
        }
        if let Some(v) = get("CEREBRAS_API_KEY") {
            self.upstream.api_key = Some(v);
        }
        if let Some(v) = get("CEREBRAS_BASE_URL") {
            self.upstream.base_url = v;
        }
        if let Some(v) = get("CEREBRAS_MODEL") {
            self.upstream.model = v;
        }
        Ok(())
    }

    /// Reject values that would only fail later at request time.
    pub fn validate(&self) -> Result<()> {
        if let Some(public) = self.server.public_url.as_deref() {
            check_http_url("server.public_url", public)?;
        }
        check_http_url("upstream.base_url", &self.upstream.base_url)?;
        if self.cache.ttl_secs == 0 {
            bail!("cache.ttl_secs must be greater than zero");
        }
        if self.upstream.timeout_secs == 0 {
            bail!("upstream.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn web_config(&self) -> WebConfig {
        WebConfig {
            bind_addr: self.server.bind.clone(),
            port: self.server.port,
            public_base_url: self.server.public_url.clone(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Upstream settings, or `None` when no API key is configured.
    pub fn llm_config(&self) -> Option<LlmClientConfig> {
        let key = self
            .upstream
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())?;
        let mut config = LlmClientConfig::cerebras(key)
            .with_timeout(Duration::from_secs(self.upstream.timeout_secs));
        config.base_url = self.upstream.base_url.trim_end_matches('/').to_owned();
        config.default_model = self.upstream.model.clone();
        Some(config)
    }
}

fn check_http_url(field: &str, raw: &str) -> Result<()> {
    let parsed =
        url::Url::parse(raw).with_context(|| format!("{field} is not a valid URL: {raw}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("{field} must be an http(s) URL: {raw}");
    }
    Ok(())
}
