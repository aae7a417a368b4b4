//! Response body modeling: arbitrary JSON, or raw text when the response
//! does not decode as JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The response body captured for a Run or Attempt. Transparent at the wire
/// level — serializes as either the raw JSON value or a plain string,
/// with no discriminant tag, so API consumers see exactly what the
/// upstream server returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonOrText {
    Json(Value),
    Text(String),
}

impl JsonOrText {
    /// Parses a raw response body: JSON if it decodes, else the raw text.
    pub fn from_raw(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => JsonOrText::Json(value),
            Err(_) => JsonOrText::Text(raw.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_json() {
        let body = JsonOrText::from_raw(r#"{"ok": true}"#);
        assert!(matches!(body, JsonOrText::Json(_)));
    }

    #[test]
    fn falls_back_to_text() {
        let body = JsonOrText::from_raw("not json at all");
        assert_eq!(body, JsonOrText::Text("not json at all".to_string()));
    }

    #[test]
    fn serializes_transparently() {
        let json_body = JsonOrText::Json(serde_json::json!({"a": 1}));
        let serialized = serde_json::to_value(&json_body).unwrap();
        assert_eq!(serialized, serde_json::json!({"a": 1}));

        let text_body = JsonOrText::Text("plain".to_string());
        let serialized = serde_json::to_value(&text_body).unwrap();
        assert_eq!(serialized, serde_json::json!("plain"));
    }
}
