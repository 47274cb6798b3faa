//! Shared API request/response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ========================================
// Envelope Types
// ========================================

/// List response envelope
///
/// Every list endpoint answers `{"results": [...], "count": n}`. A body
/// without `results` fails to decode; there is no fallback to bare arrays.
///
/// # Examples
///
/// ```
/// use tams_common::api::types::ListEnvelope;
///
/// let envelope: ListEnvelope<u32> =
///     serde_json::from_str(r#"{"results": [1, 2, 3], "count": 3}"#).unwrap();
/// assert_eq!(envelope.results, vec![1, 2, 3]);
///
/// assert!(serde_json::from_str::<ListEnvelope<u32>>("[1, 2, 3]").is_err());
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListEnvelope<T> {
    pub results: Vec<T>,

    /// Total count reported by the backend (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl<T> ListEnvelope<T> {
    pub fn new(results: Vec<T>) -> Self {
        let count = Some(results.len() as u64);
        Self { results, count }
    }
}

// ========================================
// Error Response Types
// ========================================

/// Error body returned by the backend on non-2xx responses
///
/// The backend reports errors as `{"code": ..., "message": ...}` but older
/// endpoints use `detail` or `error` for the message. Non-JSON bodies are kept
/// verbatim as the message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ApiErrorBody {
    /// Machine-readable error code (e.g. `already_assigned`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Human-readable error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
        }
    }

    /// Parse a raw response body
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => {
                let code = map.get("code").and_then(Value::as_str).map(str::to_string);
                let message = ["message", "detail", "error"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .map(str::to_string);
                Self { code, message }
            }
            _ => Self {
                code: None,
                message: Some(trimmed.to_string()),
            },
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }

    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or("no details provided")
    }
}

// ========================================
// Token Refresh Types
// ========================================

/// Body of `POST /auth/token/refresh/`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Response of `POST /auth/token/refresh/`
///
/// `refresh` is present only when the backend rotates refresh tokens.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshResponse {
    pub access: String,

    #[serde(default)]
    pub refresh: Option<String>,
}
