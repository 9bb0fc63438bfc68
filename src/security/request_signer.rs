use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::trace;

use crate::error::{ProxyError, ProxyResult};
use crate::security::Credentials;

// v02: "$02$" + hex(HMAC-SHA256(secret, key_domain_timestamp[_user]_request[_action]))
// v01: hex(SHA256(key_domain_timestamp[_user]_secret_request[_action]))

type HmacSha256 = Hmac<Sha256>;

const V02_PREFIX: &str = "$02$";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Api {
    Items,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Get,
    Set,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Get => "get",
            Action::Set => "set",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureVersion {
    V01,
    #[default]
    V02,
}

/// Identity block the vendor checks against the signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityBlock {
    pub consumer_key: String,
    pub domain: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub signature: String,
}

/// A signed request. Single-use: every call signs a fresh envelope.
///
/// Serializes as `{"security": .., "request": ..}`, the shape the Items
/// front-end SDK consumes directly.
#[derive(Debug, Clone, Serialize)]
pub struct SignedEnvelope {
    #[serde(skip)]
    pub api: Api,
    pub security: SecurityBlock,
    pub request: Value,
    #[serde(skip)]
    pub request_string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl SignedEnvelope {
    /// Form fields for a Data API POST. `request` is the exact signed string.
    pub fn form_fields(&self) -> ProxyResult<Vec<(&'static str, String)>> {
        let security = serde_json::to_string(&self.security)?;
        let mut fields = vec![("security", security), ("request", self.request_string.clone())];
        if let Some(action) = self.action {
            fields.push(("action", action.as_str().to_string()));
        }
        Ok(fields)
    }
}

fn hash_parts(version: SignatureVersion, secret: &str, parts: &[&str]) -> ProxyResult<String> {
    match version {
        SignatureVersion::V01 => {
            let mut hasher = Sha256::new();
            hasher.update(parts.join("_").as_bytes());
            Ok(format!("{:x}", hasher.finalize()))
        }
        SignatureVersion::V02 => {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .map_err(|_| ProxyError::Configuration("invalid hmac key".into()))?;
            mac.update(parts.join("_").as_bytes());
            Ok(format!("{}{:x}", V02_PREFIX, mac.finalize().into_bytes()))
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Arc<Credentials>,
    version: SignatureVersion,
}

impl RequestSigner {
    pub fn new(credentials: Arc<Credentials>) -> Self {
        Self {
            credentials,
            version: SignatureVersion::default(),
        }
    }

    pub fn with_version(mut self, version: SignatureVersion) -> Self {
        self.version = version;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn sign(&self, api: Api, payload: &Value, action: Option<Action>) -> ProxyResult<SignedEnvelope> {
        self.sign_at(api, payload, action, Utc::now())
    }

    pub fn sign_at(
        &self,
        api: Api,
        payload: &Value,
        action: Option<Action>,
        now: DateTime<Utc>,
    ) -> ProxyResult<SignedEnvelope> {
        self.credentials.ensure_complete()?;

        if !payload.is_object() {
            return Err(ProxyError::Encoding("request payload must be a JSON object".into()));
        }
        let action = match (api, action) {
            (Api::Data, None) => {
                return Err(ProxyError::Encoding("data api requests need an action".into()))
            }
            (Api::Items, Some(_)) => {
                return Err(ProxyError::Encoding("items api requests take no action".into()))
            }
            (_, action) => action,
        };

        let request_string = serde_json::to_string(payload)?;
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let user_id = self.security_user_id(api, payload);

        let creds = &self.credentials;
        let mut parts: Vec<&str> = vec![
            creds.consumer_key.as_str(),
            creds.domain.as_str(),
            timestamp.as_str(),
        ];
        if let Some(uid) = user_id.as_deref() {
            parts.push(uid);
        }
        if self.version == SignatureVersion::V01 {
            parts.push(creds.secret());
        }
        parts.push(request_string.as_str());
        if let Some(a) = action {
            parts.push(a.as_str());
        }

        let signature = hash_parts(self.version, creds.secret(), &parts)?;
        trace!(
            api = ?api,
            timestamp = %timestamp,
            signature_len = signature.len(),
            "signed vendor request"
        );

        Ok(SignedEnvelope {
            api,
            security: SecurityBlock {
                consumer_key: creds.consumer_key.clone(),
                domain: creds.domain.clone(),
                timestamp,
                user_id,
                signature,
            },
            request: payload.clone(),
            request_string,
            action,
        })
    }

    fn security_user_id(&self, api: Api, payload: &Value) -> Option<String> {
        if !self.credentials.user_id.is_empty() {
            return Some(self.credentials.user_id.clone());
        }
        match api {
            Api::Items => payload
                .get("user_id")
                .and_then(Value::as_str)
                .map(String::from),
            Api::Data => None,
        }
    }
}
