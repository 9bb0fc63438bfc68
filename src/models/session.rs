use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SessionDefaults;
use crate::error::ProxyResult;

pub const MAX_ACTIVITY_ID_LEN: usize = 36;

/// Clamp an identifier to the vendor's `activity_id` limit by keeping its prefix.
pub fn bounded_activity_id(raw: &str) -> String {
    raw.chars().take(MAX_ACTIVITY_ID_LEN).collect()
}

/// What the session renders: a stored activity template or an explicit item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    ActivityTemplateId(String),
    Items(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub configuration: RenderOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub fontsize: String,
}

/// Items API init request. Generated per end-user request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSession {
    pub user_id: String,
    pub session_id: String,
    pub activity_id: String,
    #[serde(flatten)]
    pub source: ActivitySource,
    pub rendering_type: String,
    #[serde(rename = "type")]
    pub session_type: String,
    pub name: String,
    pub state: String,
    pub config: RenderConfig,
}

impl AssessmentSession {
    pub fn new(
        defaults: &SessionDefaults,
        source: ActivitySource,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        activity_id: &str,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            activity_id: bounded_activity_id(activity_id),
            source,
            rendering_type: defaults.rendering_type.clone(),
            session_type: defaults.session_type.clone(),
            name: defaults.name.clone(),
            state: defaults.state.clone(),
            config: RenderConfig {
                configuration: RenderOptions {
                    fontsize: defaults.fontsize.clone(),
                },
            },
        }
    }

    /// Session over the configured activity template.
    pub fn from_template(defaults: &SessionDefaults, user_id: String, session_id: String) -> Self {
        Self::new(
            defaults,
            ActivitySource::ActivityTemplateId(defaults.activity_template_id.clone()),
            user_id,
            session_id,
            &defaults.activity_id,
        )
    }

    pub fn to_request(&self) -> ProxyResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
