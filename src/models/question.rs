use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};

use crate::error::{ProxyError, ProxyResult};

/// Question types that cannot be answered without an option list.
const CHOICE_TYPES: &[&str] = &["mcq", "choicematrix", "clozedropdown"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResponse {
    pub score: Number,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub scoring_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_response: Option<ScoredResponse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub valid_responses: Vec<ScoredResponse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alt_responses: Vec<ScoredResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionData {
    pub stimulus: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<QuestionOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
    /// Vendor-specific fields we do not model are passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub reference: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub data: QuestionData,
}

impl Question {
    /// Decode one inbound entry, then validate and normalize it.
    pub fn from_value(value: Value) -> ProxyResult<Self> {
        let mut question: Question = serde_json::from_value(value)
            .map_err(|e| ProxyError::Encoding(format!("malformed question: {e}")))?;
        question.validate()?;
        if question.data.question_type.is_none() {
            question.data.question_type = Some(question.question_type.clone());
        }
        Ok(question)
    }

    pub fn validate(&self) -> ProxyResult<()> {
        if self.reference.trim().is_empty() {
            return Err(ProxyError::Encoding("question reference is empty".into()));
        }
        if self.question_type.trim().is_empty() {
            return Err(ProxyError::Encoding(format!(
                "question {} has no type",
                self.reference
            )));
        }
        if self.data.stimulus.trim().is_empty() {
            return Err(ProxyError::Encoding(format!(
                "question {} has an empty stimulus",
                self.reference
            )));
        }
        if let Some(inner) = &self.data.question_type {
            if inner != &self.question_type {
                return Err(ProxyError::Encoding(format!(
                    "question {} declares type {} but data says {}",
                    self.reference, self.question_type, inner
                )));
            }
        }
        if CHOICE_TYPES.contains(&self.question_type.as_str()) && self.data.options.is_empty() {
            return Err(ProxyError::Encoding(format!(
                "{} question {} needs at least one option",
                self.question_type, self.reference
            )));
        }
        if let Some(rule) = &self.data.validation {
            if rule.scoring_type.trim().is_empty() {
                return Err(ProxyError::Encoding(format!(
                    "question {} has a validation rule without scoring_type",
                    self.reference
                )));
            }
            if rule.valid_response.is_none() && rule.valid_responses.is_empty() {
                return Err(ProxyError::Encoding(format!(
                    "question {} has a validation rule without a valid response",
                    self.reference
                )));
            }
        }
        Ok(())
    }

    /// Sample multiple-choice question used by the generated test session.
    pub fn sample_mcq(reference: impl Into<String>) -> Self {
        let options = [("A", "London"), ("B", "Paris"), ("C", "Berlin"), ("D", "Madrid")]
            .into_iter()
            .map(|(label, value)| QuestionOption {
                label: label.to_string(),
                value: value.to_string(),
            })
            .collect();

        Question {
            reference: reference.into(),
            question_type: "mcq".to_string(),
            data: QuestionData {
                stimulus: "What is the capital of France?".to_string(),
                question_type: Some("mcq".to_string()),
                options,
                validation: Some(ValidationRule {
                    scoring_type: "exactMatch".to_string(),
                    valid_response: Some(ScoredResponse {
                        score: Number::from(1),
                        value: json!(["B"]),
                    }),
                    valid_responses: Vec::new(),
                    alt_responses: Vec::new(),
                }),
                extra: Map::new(),
            },
        }
    }
}

/// Data API `set` request for `itembank/questions`.
pub fn questions_set_request(questions: &[&Question]) -> ProxyResult<Value> {
    Ok(json!({ "questions": serde_json::to_value(questions)? }))
}
