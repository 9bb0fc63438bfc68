use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{serialize_error, ProxyError};
use crate::models::{ItemData, Question};
use crate::transport::VendorResponse;
use crate::workflows::{ItemCreation, Orchestrator, QuestionItemOutcome};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryOutcome {
    Created {
        response: VendorResponse,
    },
    Failed {
        #[serde(serialize_with = "serialize_error")]
        error: ProxyError,
    },
}

/// Result for one batch entry. `reference` is absent when the entry was too
/// malformed to carry one.
#[derive(Debug, Clone, Serialize)]
pub struct EntryResult {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(flatten)]
    pub outcome: EntryOutcome,
}

impl EntryResult {
    fn created(index: usize, reference: String, response: VendorResponse) -> Self {
        Self {
            index,
            reference: Some(reference),
            outcome: EntryOutcome::Created { response },
        }
    }

    fn failed(index: usize, reference: Option<String>, error: ProxyError) -> Self {
        Self {
            index,
            reference,
            outcome: EntryOutcome::Failed { error },
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self.outcome, EntryOutcome::Created { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<EntryResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_created()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// "Successfully added N <noun>(s)", with the failure count appended when non-zero.
    pub fn message(&self, noun: &str) -> String {
        let mut message = format!("Successfully added {} {}(s)", self.succeeded(), noun);
        if self.failed() > 0 {
            message.push_str(&format!("; {} failed", self.failed()));
        }
        message
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionBatchReport {
    pub questions: BatchReport,
    /// Present only when item creation was requested; one entry per attempted item.
    pub items: Option<BatchReport>,
}

impl QuestionBatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.questions.all_succeeded()
            && self.items.as_ref().map_or(true, BatchReport::all_succeeded)
    }
}

fn entry_reference(raw: &Value) -> Option<String> {
    raw.get("reference")
        .and_then(Value::as_str)
        .map(String::from)
}

impl Orchestrator {
    /// Entries are decoded and sent one at a time; a failing entry is recorded
    /// and the batch moves on.
    pub async fn add_questions(&self, entries: Vec<Value>, create_items: bool) -> QuestionBatchReport {
        let mut questions = Vec::with_capacity(entries.len());
        let mut items = create_items.then(Vec::new);

        for (index, raw) in entries.into_iter().enumerate() {
            let reference = entry_reference(&raw);
            let question = match Question::from_value(raw) {
                Ok(q) => q,
                Err(e) => {
                    questions.push(EntryResult::failed(index, reference, e));
                    continue;
                }
            };

            let creation = if create_items {
                ItemCreation::Derived
            } else {
                ItemCreation::Suppressed
            };
            match self.create_question_and_item(&question, creation).await {
                QuestionItemOutcome::QuestionFailed {
                    question_reference,
                    error,
                } => {
                    questions.push(EntryResult::failed(index, Some(question_reference), error));
                }
                QuestionItemOutcome::QuestionCreated {
                    question_reference,
                    question,
                } => {
                    questions.push(EntryResult::created(index, question_reference, question));
                }
                QuestionItemOutcome::ItemFailed {
                    question_reference,
                    question,
                    item_reference,
                    error,
                } => {
                    questions.push(EntryResult::created(index, question_reference, question));
                    if let Some(items) = items.as_mut() {
                        items.push(EntryResult::failed(index, Some(item_reference), error));
                    }
                }
                QuestionItemOutcome::Completed {
                    question_reference,
                    question,
                    item_reference,
                    item,
                } => {
                    questions.push(EntryResult::created(index, question_reference, question));
                    if let Some(items) = items.as_mut() {
                        items.push(EntryResult::created(index, item_reference, item));
                    }
                }
            }
        }

        let report = QuestionBatchReport {
            questions: BatchReport { results: questions },
            items: items.map(|results| BatchReport { results }),
        };
        info!(
            succeeded = report.questions.succeeded(),
            failed = report.questions.failed(),
            "question batch processed"
        );
        report
    }

    pub async fn add_items(&self, entries: Vec<Value>) -> BatchReport {
        let mut results = Vec::with_capacity(entries.len());

        for (index, raw) in entries.into_iter().enumerate() {
            let reference = entry_reference(&raw);
            let payload = match ItemData::from_value(raw) {
                Ok(item) => item.into_payload(),
                Err(e) => {
                    results.push(EntryResult::failed(index, reference, e));
                    continue;
                }
            };
            match self.create_item(&payload).await {
                Ok(resp) => results.push(EntryResult::created(index, payload.reference, resp)),
                Err(e) => results.push(EntryResult::failed(index, Some(payload.reference), e)),
            }
        }

        let report = BatchReport { results };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "item batch processed"
        );
        report
    }
}
