//! JSON response envelopes shared by both APIs.
//!
//! ```json
//! { "success": true,  "data": { ... } }
//! { "success": false, "error": "Validation failed", "fields": { "name": ["is required"] } }
//! ```

use serde::{Deserialize, Serialize};

use crate::validation::FieldErrors;

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Failed response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    /// Only present for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl ApiError {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            fields: None,
        }
    }

    #[must_use]
    pub fn validation(fields: FieldErrors) -> Self {
        Self {
            success: false,
            error: "Validation failed".to_owned(),
            fields: Some(fields),
        }
    }
}

/// Acknowledgement body for operations with nothing to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_success_envelope() {
        let body = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(body, json!({ "success": true, "data": [1, 2] }));
    }

    #[test]
    fn test_error_envelope_omits_fields() {
        let body = serde_json::to_value(ApiError::new("Not found")).unwrap();
        assert_eq!(body, json!({ "success": false, "error": "Not found" }));
    }

    #[test]
    fn test_validation_envelope() {
        let body =
            serde_json::to_value(ApiError::validation(FieldErrors::single("name", "is required")))
                .unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["fields"], json!({ "name": ["is required"] }));
    }
}
