pub mod gateway;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use gateway::{HttpGateway, VendorGateway};

/// Vendor reply body: parsed JSON when the content type says so, raw text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Text(_) => None,
        }
    }
}

/// Normalized 2xx reply from the vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

/// Item-bank resources reachable through the Data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataResource {
    Questions,
    Items,
}

impl DataResource {
    pub fn path(&self) -> &'static str {
        match self {
            DataResource::Questions => "itembank/questions",
            DataResource::Items => "itembank/items",
        }
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_urls_tolerate_trailing_slash() {
        assert_eq!(
            DataResource::Questions.url("https://data.example.com/v1/"),
            "https://data.example.com/v1/itembank/questions"
        );
        assert_eq!(
            DataResource::Items.url("https://data.example.com/v1"),
            "https://data.example.com/v1/itembank/items"
        );
    }

    #[test]
    fn body_serializes_untagged() {
        let json_body = ResponseBody::Json(json!({"data": []}));
        let text_body = ResponseBody::Text("Bad Gateway".into());
        assert_eq!(serde_json::to_value(&json_body).unwrap(), json!({"data": []}));
        assert_eq!(serde_json::to_value(&text_body).unwrap(), json!("Bad Gateway"));
        assert!(text_body.as_json().is_none());
    }
}
