//! Request and Response message types.
//!
//! Defines the JSON-RPC style framing of CDP commands and their replies.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::Command;

// ============================================================================
// Request
// ============================================================================

/// A command request sent to a target.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "method": "Domain.method",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Per-connection identifier for request/response correlation.
    pub id: RequestId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Creates a new request.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, command: Command) -> Self {
        Self { id, command }
    }

    /// Returns the command's method name.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        self.command.method()
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from the target.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 1, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 1, "error": { "code": -32000, "message": "...", "data": "..." } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error object (if error).
    #[serde(default)]
    pub error: Option<ProtocolError>,
}

impl Response {
    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cdp`] carrying the protocol code and message.
    pub fn into_result(self, method: &str) -> Result<Value> {
        match self.error {
            Some(error) => Err(Error::cdp(method, error.code, error.message, error.data)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// ProtocolError
// ============================================================================

/// Error object of a failed command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProtocolError {
    /// JSON-RPC style error code.
    pub code: i64,
    /// Human readable message.
    pub message: String,
    /// Optional details, a string or any JSON value.
    #[serde(default)]
    pub data: Option<Value>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PageCommand, RawCommand};
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let command = Command::Page(PageCommand::Navigate {
            url: "https://example.com".to_string(),
        });

        let request = Request::new(RequestId::new(3), command);
        let value = serde_json::to_value(&request).expect("serialize");

        assert_eq!(
            value,
            json!({
                "id": 3,
                "method": "Page.navigate",
                "params": {"url": "https://example.com"}
            })
        );
        assert_eq!(request.method(), "Page.navigate");
    }

    #[test]
    fn test_raw_request_serialization() {
        let command = Command::Raw(RawCommand::new("Target.getTargets", json!({})));
        let request = Request::new(RequestId::new(1), command);
        let value = serde_json::to_value(&request).expect("serialize");

        assert_eq!(value["method"], "Target.getTargets");
        assert_eq!(value["params"], json!({}));
    }

    #[test]
    fn test_success_response() {
        let response: Response =
            serde_json::from_str(r#"{"id": 4, "result": {"frameId": "F1"}}"#).expect("parse");

        assert!(!response.is_error());
        let result = response.into_result("Page.navigate").expect("should succeed");
        assert_eq!(result["frameId"], "F1");
    }

    #[test]
    fn test_empty_result_is_null() {
        let response: Response = serde_json::from_str(r#"{"id": 9}"#).expect("parse");
        assert_eq!(response.into_result("Page.enable").expect("ok"), Value::Null);
    }

    #[test]
    fn test_error_response() {
        let response: Response = serde_json::from_str(
            r#"{"id": 5, "error": {"code": -32601, "message": "'Foo.bar' wasn't found"}}"#,
        )
        .expect("parse");

        assert!(response.is_error());
        match response.into_result("Foo.bar") {
            Err(Error::Cdp {
                method,
                code,
                message,
                data,
            }) => {
                assert_eq!(method, "Foo.bar");
                assert_eq!(code, -32601);
                assert!(message.contains("wasn't found"));
                assert!(data.is_none());
            }
            other => panic!("expected Cdp error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_response_with_structured_data() {
        let response: Response = serde_json::from_str(
            r#"{"id": 6, "error": {"code": -32000, "message": "bad", "data": {"detail": 1}}}"#,
        )
        .expect("parse");

        let err = response.into_result("X.y").expect_err("should fail");
        assert!(matches!(err, Error::Cdp { ref data, .. } if data.as_deref() == Some(r#"{"detail":1}"#)));
    }

    #[test]
    fn test_error_response_with_string_data() {
        let response: Response = serde_json::from_str(
            r#"{"id": 7, "error": {"code": -32000, "message": "bad", "data": "no frame"}}"#,
        )
        .expect("parse");

        let err = response.into_result("X.y").expect_err("should fail");
        assert!(matches!(err, Error::Cdp { ref data, .. } if data.as_deref() == Some("no frame")));
    }
}
