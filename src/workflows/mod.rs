//! Vendor workflows: single signed Data API calls plus the multi-step
//! question → item → session choreography built on top of them.

pub mod batch;
pub mod question_item;

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{Config, SessionDefaults};
use crate::error::ProxyResult;
use crate::models::item::{item_get_request, items_set_request};
use crate::models::question::questions_set_request;
use crate::models::{AssessmentSession, ItemPayload, Question};
use crate::security::{Action, Api, Credentials, RequestSigner, SignedEnvelope};
use crate::transport::{DataResource, VendorGateway, VendorResponse};

pub use batch::{BatchReport, EntryOutcome, EntryResult, QuestionBatchReport};
pub use full_test::{FullTestError, FullTestIds, FullTestStage};
pub use question_item::{ItemCreation, QuestionItemOutcome};

const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Retries apply to transport failures only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff: config.retry_backoff(),
        }
    }

    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1), capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        std::cmp::min(self.base_backoff.saturating_mul(factor), MAX_BACKOFF)
    }
}

/// Signed Items API init for the configured template session.
pub fn signed_template_session(
    signer: &RequestSigner,
    defaults: &SessionDefaults,
) -> ProxyResult<SignedEnvelope> {
    let session = AssessmentSession::from_template(
        defaults,
        Uuid::new_v4().to_string(),
        Uuid::new_v4().to_string(),
    );
    signer.sign(Api::Items, &session.to_request()?, None)
}

/// Composes the request signer and the vendor gateway. Holds no mutable state;
/// clones share the same credentials and gateway.
#[derive(Clone)]
pub struct Orchestrator {
    signer: RequestSigner,
    gateway: Arc<dyn VendorGateway>,
    data_api_url: String,
    retry: RetryPolicy,
    session: SessionDefaults,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        credentials: Arc<Credentials>,
        gateway: Arc<dyn VendorGateway>,
    ) -> Self {
        Self {
            signer: RequestSigner::new(credentials),
            gateway,
            data_api_url: config.data_api_url.clone(),
            retry: RetryPolicy::from_config(config),
            session: config.session.clone(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    /// One logical Data API call. Every attempt signs a fresh envelope.
    async fn dispatch(
        &self,
        resource: DataResource,
        action: Action,
        payload: &Value,
    ) -> ProxyResult<VendorResponse> {
        let url = resource.url(&self.data_api_url);
        let mut attempt = 0u32;
        loop {
            let envelope = self.signer.sign(Api::Data, payload, Some(action))?;
            match self.gateway.send(&url, &envelope).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    warn!(
                        resource = resource.path(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "vendor call failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn create_question(&self, question: &Question) -> ProxyResult<VendorResponse> {
        debug!(reference = %question.reference, "creating question");
        let payload = questions_set_request(&[question])?;
        self.dispatch(DataResource::Questions, Action::Set, &payload)
            .await
    }

    pub async fn create_item(&self, item: &ItemPayload) -> ProxyResult<VendorResponse> {
        debug!(reference = %item.reference, questions = item.questions.len(), "creating item");
        let payload = items_set_request(&[item])?;
        self.dispatch(DataResource::Items, Action::Set, &payload).await
    }

    pub async fn get_item(&self, reference: &str) -> ProxyResult<VendorResponse> {
        debug!(reference = %reference, "fetching item");
        self.dispatch(DataResource::Items, Action::Get, &item_get_request(reference))
            .await
    }

    pub fn items_session(&self) -> ProxyResult<SignedEnvelope> {
        signed_template_session(&self.signer, &self.session)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::error::ProxyError;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_backoff: Duration::from_millis(200),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
        assert_eq!(policy.delay(30), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn transport_errors_are_retried_with_fresh_envelopes() {
        let gateway = ScriptedGateway::new(vec![
            Err(ProxyError::Transport("connection reset".into())),
            Ok(ok_reply()),
        ]);
        let orch = orchestrator(gateway.clone());

        let resp = orch.get_item("item_1").await.unwrap();
        assert_eq!(resp.status_code, 200);

        let calls = gateway.recorded();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].url, "https://data.test/v1/itembank/items");
        assert_eq!(calls[0].envelope.action, Some(Action::Get));
        assert_eq!(calls[0].envelope.request["references"][0], "item_1");
    }

    #[tokio::test]
    async fn retries_stop_at_the_limit() {
        let gateway = ScriptedGateway::new(vec![
            Err(ProxyError::Transport("down".into())),
            Err(ProxyError::Transport("down".into())),
            Err(ProxyError::Transport("down".into())),
            Ok(ok_reply()),
        ]);
        let orch = orchestrator(gateway.clone());

        let err = orch.get_item("item_1").await.unwrap_err();
        assert!(matches!(err, ProxyError::Transport(_)));
        assert_eq!(gateway.recorded().len(), 3);
    }

    #[tokio::test]
    async fn upstream_errors_are_not_retried() {
        let gateway = ScriptedGateway::new(vec![Err(upstream(500))]);
        let orch = orchestrator(gateway.clone());

        let err = orch.get_item("item_1").await.unwrap_err();
        assert!(matches!(err, ProxyError::Upstream { status_code: 500, .. }));
        assert_eq!(gateway.recorded().len(), 1);
    }

    #[tokio::test]
    async fn create_question_posts_set_to_questions() {
        let gateway = ScriptedGateway::new(vec![]);
        let orch = orchestrator(gateway.clone());

        orch.create_question(&Question::sample_mcq("q1")).await.unwrap();

        let calls = gateway.recorded();
        assert_eq!(calls[0].url, "https://data.test/v1/itembank/questions");
        assert_eq!(calls[0].envelope.action, Some(Action::Set));
        assert_eq!(calls[0].envelope.request["questions"][0]["reference"], "q1");
    }

    #[test]
    fn template_session_is_signed_for_items_api() {
        let orch = orchestrator(ScriptedGateway::new(vec![]));
        let env = orch.items_session().unwrap();
        assert_eq!(env.api, Api::Items);
        assert_eq!(env.request["activity_template_id"], "NY-activity");
        assert!(env.security.signature.starts_with("$02$"));
        assert_ne!(env.request["user_id"], env.request["session_id"]);
    }
}
