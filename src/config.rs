use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

pub const DEFAULT_DATA_API_URL: &str = "https://data.learnosity.com/v2023.1.LTS";

/// Rendering defaults for the sessions handed to the front-end SDK.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    pub activity_template_id: String,
    pub activity_id: String,
    pub rendering_type: String,
    pub session_type: String,
    pub name: String,
    pub state: String,
    pub fontsize: String,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            activity_template_id: "NY-activity".to_string(),
            activity_id: "quickstart_examples_activity_001".to_string(),
            rendering_type: "assess".to_string(),
            session_type: "submit_practice".to_string(),
            name: "Items API Quickstart".to_string(),
            state: "initial".to_string(),
            fontsize: "large".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Domain declared in every signed security block.
    pub domain: String,
    pub user_id: String,
    pub data_api_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub cors_origins: Vec<String>,
    pub session: SessionDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: "localhost".to_string(),
            user_id: "abc".to_string(),
            data_api_url: DEFAULT_DATA_API_URL.to_string(),
            request_timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 200,
            cors_origins: vec!["http://localhost:3000".to_string()],
            session: SessionDefaults::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).context("reading config file")?;
        let cfg: Config = serde_json::from_str(&raw).context("parsing config JSON")?;
        Ok(cfg)
    }

    /// File first (when given), then environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Credentialed CORS needs explicit origins, so wildcards are refused.
    pub fn validate(&self) -> Result<()> {
        if let Some(origin) = self.cors_origins.iter().find(|o| o.contains('*')) {
            anyhow::bail!(
                "wildcard CORS origin `{}` is not allowed; list explicit origins",
                origin
            );
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("PROXY_DOMAIN") {
            self.domain = v;
        }
        if let Ok(v) = std::env::var("PROXY_USER_ID") {
            self.user_id = v;
        }
        if let Ok(v) = std::env::var("DATA_API_URL") {
            self.data_api_url = v;
        }
        if let Ok(v) = std::env::var("VENDOR_TIMEOUT_SECS") {
            self.request_timeout_secs = v.parse().context("parsing VENDOR_TIMEOUT_SECS")?;
        }
        if let Ok(v) = std::env::var("VENDOR_MAX_RETRIES") {
            self.max_retries = v.parse().context("parsing VENDOR_MAX_RETRIES")?;
        }
        if let Ok(v) = std::env::var("CORS_ORIGINS") {
            self.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
