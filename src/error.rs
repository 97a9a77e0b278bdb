//! Error types for the CDP harness.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use cdp_harness::{Error, Result};
//!
//! async fn example(page: &TargetSession) -> Result<()> {
//!     page.send_key("Escape").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Cdp`], [`Error::Protocol`], [`Error::RequestTimeout`] |
//! | Discovery | [`Error::TargetNotFound`], [`Error::Http`] |
//! | Execution | [`Error::ScriptEvaluation`], [`Error::UnexpectedValue`], [`Error::UnknownKey`] |
//! | Waiting | [`Error::WaitTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when harness configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument passed to a harness operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the debugging socket cannot be opened.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// WebSocket handshake did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Operation attempted on, or pending during, a closed connection.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// The browser answered a command with an error object.
    #[error("CDP error {code} in {method}: {message}")]
    Cdp {
        /// Method of the failed command.
        method: String,
        /// Protocol error code.
        code: i64,
        /// Protocol error message.
        message: String,
        /// Optional protocol error details.
        data: Option<String>,
    },

    /// Protocol violation or unexpected message shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Command request timeout.
    #[error("Request {request_id} ({method}) timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Method of the command.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// No live target matched the discovery query.
    ///
    /// Fatal for the calling test: retrying does not create a target.
    #[error("Target not found: {criteria}")]
    TargetNotFound {
        /// Description of what was searched for.
        criteria: String,
    },

    /// Discovery endpoint request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Remote script threw while being evaluated.
    #[error("Script evaluation failed: {message}")]
    ScriptEvaluation {
        /// Exception message (or CDP exception text).
        message: String,
        /// Remote stack trace, when the exception carried one.
        stack: Option<String>,
        /// Zero-based line of the throw site.
        line: i64,
        /// Zero-based column of the throw site.
        column: i64,
    },

    /// Remote value did not have the expected shape.
    #[error("Unexpected value: expected {expected}, got {actual}")]
    UnexpectedValue {
        /// Expected shape.
        expected: String,
        /// Observed value, rendered.
        actual: String,
    },

    /// Key token could not be resolved to a key event.
    #[error("Unknown key token: {token:?}")]
    UnknownKey {
        /// The offending token.
        token: String,
    },

    // ========================================================================
    // Waiting Errors
    // ========================================================================
    /// A polled or event-based condition never became true.
    #[error("Timed out after {timeout_ms}ms waiting for {operation} (last state: {last_state})")]
    WaitTimeout {
        /// Description of the awaited condition.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
        /// Last observed state of the condition.
        last_state: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a CDP error from a protocol error response.
    #[inline]
    pub fn cdp(
        method: impl Into<String>,
        code: i64,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let data = data.map(|data| match data {
            Value::String(text) => text,
            other => other.to_string(),
        });
        Self::Cdp {
            method: method.into(),
            code,
            message: message.into(),
            data,
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            method: method.into(),
            timeout_ms,
        }
    }

    /// Creates a target not found error.
    #[inline]
    pub fn target_not_found(criteria: impl Into<String>) -> Self {
        Self::TargetNotFound {
            criteria: criteria.into(),
        }
    }

    /// Creates a script evaluation error without location details.
    #[inline]
    pub fn script_evaluation(message: impl Into<String>) -> Self {
        Self::ScriptEvaluation {
            message: message.into(),
            stack: None,
            line: 0,
            column: 0,
        }
    }

    /// Creates an unexpected value error.
    #[inline]
    pub fn unexpected_value(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an unknown key error.
    #[inline]
    pub fn unknown_key(token: impl Into<String>) -> Self {
        Self::UnknownKey {
            token: token.into(),
        }
    }

    /// Creates a wait timeout error.
    #[inline]
    pub fn wait_timeout(
        operation: impl Into<String>,
        timeout_ms: u64,
        last_state: impl Into<String>,
    ) -> Self {
        Self::WaitTimeout {
            operation: operation.into(),
            timeout_ms,
            last_state: last_state.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. } | Self::WaitTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors are transient page states that a wait loop may
    /// observe again with a different outcome.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ScriptEvaluation { .. }
                | Self::UnexpectedValue { .. }
                | Self::Cdp { .. }
                | Self::Protocol { .. }
                | Self::RequestTimeout { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "Connection failed: failed to connect");
    }

    #[test]
    fn test_cdp_error_display() {
        let err = Error::cdp("Runtime.evaluate", -32000, "Cannot find context", None);
        assert_eq!(
            err.to_string(),
            "CDP error -32000 in Runtime.evaluate: Cannot find context"
        );
    }

    #[test]
    fn test_cdp_error_keeps_structured_data() {
        let err = Error::cdp("X.y", -32000, "boom", Some(serde_json::json!({"detail": 1})));
        assert!(matches!(err, Error::Cdp { data: Some(ref d), .. } if d == r#"{"detail":1}"#));

        let err = Error::cdp("X.y", -32000, "boom", Some(Value::String("plain".into())));
        assert!(matches!(err, Error::Cdp { data: Some(ref d), .. } if d == "plain"));
    }

    #[test]
    fn test_wait_timeout_display_includes_last_state() {
        let err = Error::wait_timeout("hints visible", 2000, "false after 40 attempts");
        let text = err.to_string();
        assert!(text.contains("2000ms"));
        assert!(text.contains("hints visible"));
        assert!(text.contains("false after 40 attempts"));
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::ConnectionTimeout { timeout_ms: 5000 };
        let wait_err = Error::wait_timeout("x", 10, "y");
        let other_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(wait_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        let conn_err = Error::connection("test");
        let timeout_err = Error::ConnectionTimeout { timeout_ms: 1000 };
        let closed_err = Error::ConnectionClosed;
        let other_err = Error::config("test");

        assert!(conn_err.is_connection_error());
        assert!(timeout_err.is_connection_error());
        assert!(closed_err.is_connection_error());
        assert!(!other_err.is_connection_error());
        assert!(!Error::target_not_found("page").is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        let script_err = Error::script_evaluation("document.body is null");
        let closed_err = Error::ConnectionClosed;

        assert!(script_err.is_recoverable());
        assert!(Error::protocol("Unreadable response").is_recoverable());
        assert!(!closed_err.is_recoverable());
        assert!(!Error::target_not_found("background").is_recoverable());
        assert!(!Error::invalid_argument("empty key").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
