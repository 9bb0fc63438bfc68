use std::fmt;

use crate::config::Config;
use crate::error::{ProxyError, ProxyResult};

pub const CONSUMER_KEY_ENV: &str = "CONSUMER_KEY";
pub const CONSUMER_SECRET_ENV: &str = "CONSUMER_SECRET";

/// Vendor identity used to sign every outbound request.
///
/// Built once at startup and shared read-only afterwards. `Debug` redacts the
/// secret so the struct can sit inside traced state.
#[derive(Clone)]
pub struct Credentials {
    pub user_id: String,
    pub consumer_key: String,
    consumer_secret: String,
    pub domain: String,
}

impl Credentials {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        domain: impl Into<String>,
        user_id: impl Into<String>,
    ) -> ProxyResult<Self> {
        let creds = Self {
            user_id: user_id.into(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            domain: domain.into(),
        };
        creds.ensure_complete()?;
        Ok(creds)
    }

    /// Key and secret come from the environment only, never from the config file.
    pub fn from_env(config: &Config) -> ProxyResult<Self> {
        let key = std::env::var(CONSUMER_KEY_ENV)
            .map_err(|_| ProxyError::Configuration(format!("{CONSUMER_KEY_ENV} is not set")))?;
        let secret = std::env::var(CONSUMER_SECRET_ENV).map_err(|_| {
            ProxyError::Configuration(format!("{CONSUMER_SECRET_ENV} is not set"))
        })?;
        Self::new(key, secret, config.domain.clone(), config.user_id.clone())
    }

    pub fn ensure_complete(&self) -> ProxyResult<()> {
        if self.consumer_key.trim().is_empty() {
            return Err(ProxyError::Configuration("consumer key is empty".into()));
        }
        if self.consumer_secret.trim().is_empty() {
            return Err(ProxyError::Configuration("consumer secret is empty".into()));
        }
        if self.domain.trim().is_empty() {
            return Err(ProxyError::Configuration("domain is empty".into()));
        }
        Ok(())
    }

    pub(crate) fn secret(&self) -> &str {
        &self.consumer_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("domain", &self.domain)
            .finish()
    }
}
