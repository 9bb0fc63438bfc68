use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ProxyError, ProxyResult};
use crate::models::Question;

const DEFAULT_ITEM_STATUS: &str = "published";
const DERIVED_ITEM_PREFIX: &str = "item_";

/// Reference of the item auto-created for a question.
pub fn derived_item_reference(question_reference: &str) -> String {
    format!("{DERIVED_ITEM_PREFIX}{question_reference}")
}

/// Item as callers submit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub reference: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub questions: Vec<String>,
    #[serde(default)]
    pub definition: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRef {
    pub reference: String,
}

/// Item in the vendor's item-bank schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPayload {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    pub questions: Vec<QuestionRef>,
    pub definition: Value,
}

impl ItemData {
    pub fn from_value(value: Value) -> ProxyResult<Self> {
        let item: ItemData = serde_json::from_value(value)
            .map_err(|e| ProxyError::Encoding(format!("malformed item: {e}")))?;
        item.validate()?;
        Ok(item)
    }

    /// Item bundling a single already-created question.
    pub fn for_question(reference: impl Into<String>, question: &Question) -> Self {
        Self {
            reference: reference.into(),
            name: Some(format!("Item for {}", question.reference)),
            description: None,
            status: None,
            questions: vec![question.reference.clone()],
            definition: None,
        }
    }

    pub fn validate(&self) -> ProxyResult<()> {
        if self.reference.trim().is_empty() {
            return Err(ProxyError::Encoding("item reference is empty".into()));
        }
        if self.questions.is_empty() {
            return Err(ProxyError::Encoding(format!(
                "item {} references no questions",
                self.reference
            )));
        }
        if self.questions.iter().any(|q| q.trim().is_empty()) {
            return Err(ProxyError::Encoding(format!(
                "item {} has an empty question reference",
                self.reference
            )));
        }
        if let Some(def) = &self.definition {
            if !def.is_object() {
                return Err(ProxyError::Encoding(format!(
                    "item {} definition must be an object",
                    self.reference
                )));
            }
        }
        Ok(())
    }

    pub fn into_payload(self) -> ItemPayload {
        let definition = self
            .definition
            .unwrap_or_else(|| default_definition(&self.questions));
        ItemPayload {
            reference: self.reference,
            title: self.name,
            description: self.description,
            status: self
                .status
                .unwrap_or_else(|| DEFAULT_ITEM_STATUS.to_string()),
            questions: self
                .questions
                .into_iter()
                .map(|reference| QuestionRef { reference })
                .collect(),
            definition,
        }
    }
}

/// Dynamic layout with one widget per question, in order.
pub fn default_definition(question_refs: &[String]) -> Value {
    let widgets: Vec<Value> = question_refs
        .iter()
        .map(|r| json!({ "reference": r }))
        .collect();
    json!({ "template": "dynamic", "widgets": widgets })
}

/// Data API `set` request for `itembank/items`.
pub fn items_set_request(items: &[&ItemPayload]) -> ProxyResult<Value> {
    Ok(json!({ "items": serde_json::to_value(items)? }))
}

/// Data API `get` request for a single item.
pub fn item_get_request(reference: &str) -> Value {
    json!({ "references": [reference] })
}
