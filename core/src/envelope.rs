//! The `{success, data|error}` envelope every tool call returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Uniform result of a tool call. Exactly one of `data` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("success".to_string(), Value::Bool(self.success));
        if let Some(data) = &self.data {
            map.insert("data".to_string(), data.clone());
        }
        if let Some(error) = &self.error {
            map.insert("error".to_string(), Value::String(error.clone()));
        }
        Value::Object(map)
    }

    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }
}

impl From<Result<Value, ApiError>> for Envelope {
    fn from(result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(e) => Envelope::err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_omits_error_key() {
        let value = Envelope::ok(json!({"id": "t-1"})).to_value();
        assert_eq!(value, json!({"success": true, "data": {"id": "t-1"}}));
    }

    #[test]
    fn success_with_null_data_keeps_the_key() {
        let value = Envelope::ok(Value::Null).to_value();
        assert_eq!(value, json!({"success": true, "data": null}));
    }

    #[test]
    fn failure_omits_data_key() {
        let value = Envelope::err("Task not found.").to_value();
        assert_eq!(value, json!({"success": false, "error": "Task not found."}));
    }

    #[test]
    fn from_result_uses_error_display() {
        let env: Envelope = Err(ApiError::Transport("timed out".to_string())).into();
        assert_eq!(env.error.as_deref(), Some("Request failed: timed out"));
        assert!(!env.success);
    }

    #[test]
    fn serde_matches_to_value() {
        let env = Envelope::err("boom");
        assert_eq!(serde_json::to_value(&env).unwrap(), env.to_value());
    }
}
