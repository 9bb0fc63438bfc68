use serde::Serialize;
use tracing::{info, warn};

use crate::error::{serialize_error, ProxyError, ProxyResult};
use crate::models::{derived_item_reference, ItemData, Question};
use crate::transport::VendorResponse;
use crate::workflows::Orchestrator;

/// Whether the question workflow also creates the derived item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCreation {
    Derived,
    Suppressed,
}

/// Terminal states of the question → item workflow.
///
/// An item is only ever attempted after its question was accepted, so every
/// variant that names an item also carries the question's vendor reply.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuestionItemOutcome {
    QuestionFailed {
        question_reference: String,
        #[serde(serialize_with = "serialize_error")]
        error: ProxyError,
    },
    QuestionCreated {
        question_reference: String,
        question: VendorResponse,
    },
    ItemFailed {
        question_reference: String,
        question: VendorResponse,
        item_reference: String,
        #[serde(serialize_with = "serialize_error")]
        error: ProxyError,
    },
    Completed {
        question_reference: String,
        question: VendorResponse,
        item_reference: String,
        item: VendorResponse,
    },
}

impl QuestionItemOutcome {
    pub fn question_reference(&self) -> &str {
        match self {
            QuestionItemOutcome::QuestionFailed { question_reference, .. }
            | QuestionItemOutcome::QuestionCreated { question_reference, .. }
            | QuestionItemOutcome::ItemFailed { question_reference, .. }
            | QuestionItemOutcome::Completed { question_reference, .. } => question_reference,
        }
    }

    pub fn question_created(&self) -> bool {
        !matches!(self, QuestionItemOutcome::QuestionFailed { .. })
    }

    pub fn item_reference(&self) -> Option<&str> {
        match self {
            QuestionItemOutcome::ItemFailed { item_reference, .. }
            | QuestionItemOutcome::Completed { item_reference, .. } => Some(item_reference),
            _ => None,
        }
    }

    /// True when every step that was requested succeeded.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            QuestionItemOutcome::QuestionCreated { .. } | QuestionItemOutcome::Completed { .. }
        )
    }

    /// The failure that ended the workflow, if any.
    pub fn error(&self) -> Option<&ProxyError> {
        match self {
            QuestionItemOutcome::QuestionFailed { error, .. }
            | QuestionItemOutcome::ItemFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl Orchestrator {
    /// Create an item bundling `question` under `item_reference` with the default layout.
    pub async fn create_item_for_question(
        &self,
        question: &Question,
        item_reference: &str,
    ) -> ProxyResult<VendorResponse> {
        let item = ItemData::for_question(item_reference, question).into_payload();
        self.create_item(&item).await
    }

    /// Create `question`, then (unless suppressed) the item derived from it.
    ///
    /// No compensation: if the item fails the question stays in the bank and
    /// the outcome says so.
    pub async fn create_question_and_item(
        &self,
        question: &Question,
        items: ItemCreation,
    ) -> QuestionItemOutcome {
        let question_reference = question.reference.clone();

        let question_resp = match self.create_question(question).await {
            Ok(resp) => resp,
            Err(error) => {
                warn!(reference = %question_reference, error = %error, "question creation failed");
                return QuestionItemOutcome::QuestionFailed {
                    question_reference,
                    error,
                };
            }
        };
        info!(reference = %question_reference, "question created");

        if items == ItemCreation::Suppressed {
            return QuestionItemOutcome::QuestionCreated {
                question_reference,
                question: question_resp,
            };
        }

        let item_reference = derived_item_reference(&question_reference);
        match self.create_item_for_question(question, &item_reference).await {
            Ok(item) => {
                info!(reference = %item_reference, question = %question_reference, "item created");
                QuestionItemOutcome::Completed {
                    question_reference,
                    question: question_resp,
                    item_reference,
                    item,
                }
            }
            Err(error) => {
                warn!(
                    reference = %item_reference,
                    question = %question_reference,
                    error = %error,
                    "item creation failed after question was created"
                );
                QuestionItemOutcome::ItemFailed {
                    question_reference,
                    question: question_resp,
                    item_reference,
                    error,
                }
            }
        }
    }
}
