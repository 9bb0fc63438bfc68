use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::transport::ResponseBody;

/// Failures surfaced by the proxy, from startup through vendor calls.
#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    /// Missing or invalid credentials. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The payload could not be decoded or built into the vendor's wire format.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The vendor could not be reached (connect failure or timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The vendor answered outside the 2xx range.
    #[error("upstream returned status {status_code}")]
    Upstream {
        status_code: u16,
        body: ResponseBody,
    },
}

pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProxyError::Transport(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Configuration(_) => "configuration",
            ProxyError::Encoding(_) => "encoding",
            ProxyError::Transport(_) => "transport",
            ProxyError::Upstream { .. } => "upstream",
        }
    }

    /// Status returned to our own caller when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Encoding(_) => StatusCode::BAD_REQUEST,
            ProxyError::Transport(_) | ProxyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        match self {
            ProxyError::Upstream { status_code, body } => ErrorBody {
                kind: self.kind(),
                message: self.to_string(),
                status_code: Some(*status_code),
                body: Some(body.clone()),
            },
            _ => ErrorBody {
                kind: self.kind(),
                message: self.to_string(),
                status_code: None,
                body: None,
            },
        }
    }
}

/// Serialized form of a [`ProxyError`] embedded in results and replies.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ResponseBody>,
}

/// `serialize_with` helper so results can carry the error itself.
pub fn serialize_error<S>(error: &ProxyError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    error.to_body().serialize(serializer)
}

impl From<serde_json::Error> for ProxyError {
    fn from(e: serde_json::Error) -> Self {
        ProxyError::Encoding(e.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(json!({"success": false, "error": self.to_body()})),
        )
            .into_response()
    }
}
