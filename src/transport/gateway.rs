use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ProxyError, ProxyResult};
use crate::security::SignedEnvelope;
use crate::transport::{ResponseBody, VendorResponse};

/// Outbound seam to the vendor. One call is one network attempt; retries are
/// the caller's business.
#[async_trait]
pub trait VendorGateway: Send + Sync {
    async fn send(&self, url: &str, envelope: &SignedEnvelope) -> ProxyResult<VendorResponse>;
}

/// Data API gateway over reqwest: form-encoded POST, bounded by a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(timeout: Duration) -> ProxyResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::Configuration(format!("building http client: {e}")))?;
        Ok(Self { client, timeout })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> ProxyError {
    if e.is_timeout() {
        ProxyError::Transport(format!("timed out calling {url}"))
    } else if e.is_connect() {
        ProxyError::Transport(format!("connection to {url} failed: {e}"))
    } else if e.is_builder() {
        ProxyError::Encoding(format!("building request for {url}: {e}"))
    } else {
        ProxyError::Transport(format!("request to {url} failed: {e}"))
    }
}

#[async_trait]
impl VendorGateway for HttpGateway {
    async fn send(&self, url: &str, envelope: &SignedEnvelope) -> ProxyResult<VendorResponse> {
        let fields = envelope.form_fields()?;

        debug!(
            url = %url,
            action = ?envelope.action,
            timeout_secs = %self.timeout.as_secs(),
            "sending signed data api request"
        );

        let resp = self
            .client
            .post(url)
            .timeout(self.timeout)
            .form(&fields)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = resp.status();
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);
        let text = resp.text().await.map_err(|e| transport_error(url, e))?;

        let body = if is_json {
            match serde_json::from_str(&text) {
                Ok(v) => ResponseBody::Json(v),
                Err(_) => ResponseBody::Text(text),
            }
        } else {
            ResponseBody::Text(text)
        };

        let status_code = status.as_u16();
        if !status.is_success() {
            warn!(url = %url, status_code = %status_code, "vendor returned non-success status");
            return Err(ProxyError::Upstream { status_code, body });
        }

        debug!(url = %url, status_code = %status_code, "vendor call succeeded");
        Ok(VendorResponse { status_code, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{Action, Api, Credentials, RequestSigner};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;

    fn envelope(action: Action) -> SignedEnvelope {
        let creds = Credentials::new("key-1", "secret-1", "localhost", "abc").unwrap();
        RequestSigner::new(Arc::new(creds))
            .sign(Api::Data, &json!({"references": ["item_1"]}), Some(action))
            .unwrap()
    }

    fn gateway() -> HttpGateway {
        HttpGateway::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn posts_signed_form_and_parses_json() {
        let mut server = Server::new_async().await;
        let env = envelope(Action::Get);
        let mock = server
            .mock("POST", "/itembank/items")
            .match_header(
                "content-type",
                Matcher::Exact("application/x-www-form-urlencoded".into()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("action".into(), "get".into()),
                Matcher::UrlEncoded("request".into(), r#"{"references":["item_1"]}"#.into()),
                Matcher::UrlEncoded(
                    "security".into(),
                    serde_json::to_string(&env.security).unwrap(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"meta":{"status":true},"data":[{"reference":"item_1"}]}"#)
            .create_async()
            .await;

        let url = format!("{}/itembank/items", server.url());
        let resp = gateway().send(&url, &env).await.expect("send should succeed");

        assert_eq!(resp.status_code, 200);
        assert_eq!(
            resp.body.as_json().unwrap()["data"][0]["reference"],
            "item_1"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_keeps_vendor_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/itembank/items")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"meta":{"status":false,"message":"not found"}}"#)
            .create_async()
            .await;

        let url = format!("{}/itembank/items", server.url());
        let err = gateway().send(&url, &envelope(Action::Get)).await.unwrap_err();
        match err {
            ProxyError::Upstream { status_code, body } => {
                assert_eq!(status_code, 404);
                assert_eq!(body.as_json().unwrap()["meta"]["message"], "not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_text_body_stays_text() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/itembank/questions")
            .with_status(500)
            .with_header("content-type", "text/plain")
            .with_body("internal failure")
            .create_async()
            .await;

        let url = format!("{}/itembank/questions", server.url());
        let err = gateway().send(&url, &envelope(Action::Set)).await.unwrap_err();
        assert!(matches!(
            err,
            ProxyError::Upstream { status_code: 500, body: ResponseBody::Text(ref t) } if t == "internal failure"
        ));
    }

    #[tokio::test]
    async fn unreachable_vendor_is_transport_error() {
        let err = gateway()
            .send("http://127.0.0.1:1/itembank/items", &envelope(Action::Get))
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "expected transport error, got {err:?}");
    }
}
