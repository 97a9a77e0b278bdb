//! Remote script evaluation.
//!
//! Scripts run through `Runtime.evaluate` with `awaitPromise` and
//! `returnByValue`, so a returned promise is settled remotely and only the
//! JSON value crosses the socket.
//!
//! # Example
//!
//! ```no_run
//! use cdp_harness::{Connection, RemoteExpression, ReturnShape, execute_in_target};
//! use serde_json::json;
//!
//! # async fn example(connection: &Connection) -> cdp_harness::Result<()> {
//! let expression = RemoteExpression::call(
//!     "(selector) => document.querySelectorAll(selector).length",
//!     &[json!(".hint")],
//! )
//! .returning(ReturnShape::Number);
//!
//! let count = execute_in_target(connection, &expression, None).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::any::type_name;
use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::{Command, EvaluateResult, ExceptionDetails, RemoteObject, RuntimeCommand};
use crate::transport::Connection;

// ============================================================================
// Constants
// ============================================================================

/// Maximum characters of a value rendered into an error.
const MAX_RENDERED_VALUE: usize = 200;

// ============================================================================
// ReturnShape
// ============================================================================

/// Expected JSON shape of a script result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnShape {
    /// Any value, including `null`.
    #[default]
    Any,
    /// `true` or `false`.
    Bool,
    /// A number.
    Number,
    /// A string.
    String,
    /// An array.
    Array,
    /// A plain object.
    Object,
    /// `null` or `undefined`.
    Null,
}

impl ReturnShape {
    /// Returns `true` if `value` has this shape.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Bool => value.is_boolean(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Null => value.is_null(),
        }
    }

    fn check(self, value: &Value) -> Result<()> {
        if self.matches(value) {
            Ok(())
        } else {
            Err(Error::unexpected_value(self.to_string(), render(value)))
        }
    }
}

impl fmt::Display for ReturnShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Any => "any value",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        };
        f.write_str(name)
    }
}

// ============================================================================
// RemoteExpression
// ============================================================================

/// JavaScript source paired with the shape of its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteExpression {
    source: String,
    shape: ReturnShape,
}

impl RemoteExpression {
    /// Wraps an expression as-is.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            shape: ReturnShape::Any,
        }
    }

    /// Wraps a function body in an async IIFE; use `return` to yield a value.
    #[must_use]
    pub fn function(body: &str) -> Self {
        Self::new(format!("(async () => {{\n{body}\n}})()"))
    }

    /// Calls a function expression with JSON-encoded arguments.
    ///
    /// Arguments are embedded as JSON literals, never spliced as source.
    #[must_use]
    pub fn call(function: &str, args: &[Value]) -> Self {
        let args = args
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(format!("({function})({args})"))
    }

    /// Sets the expected result shape.
    #[inline]
    #[must_use]
    pub fn returning(mut self, shape: ReturnShape) -> Self {
        self.shape = shape;
        self
    }

    /// Returns the JavaScript source.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the expected result shape.
    #[inline]
    #[must_use]
    pub fn shape(&self) -> ReturnShape {
        self.shape
    }
}

impl From<&str> for RemoteExpression {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for RemoteExpression {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Evaluates an expression in a target and returns its JSON value.
///
/// `undefined` and `null` both yield `Value::Null`. `NaN`, `Infinity`,
/// `-0` and bigints yield their string form.
///
/// # Errors
///
/// - [`Error::ScriptEvaluation`] if the script throws or its promise rejects
/// - [`Error::UnexpectedValue`] if the value does not match the expected shape
/// - [`Error::RequestTimeout`] if `timeout` elapses first
/// - Any connection error
pub async fn execute_in_target(
    connection: &Connection,
    expression: &RemoteExpression,
    timeout: Option<Duration>,
) -> Result<Value> {
    trace!(len = expression.source.len(), "Evaluating expression");

    let command = Command::Runtime(RuntimeCommand::Evaluate {
        expression: expression.source.clone(),
        await_promise: true,
        return_by_value: true,
        user_gesture: true,
    });

    let raw = match timeout {
        Some(timeout) => connection.execute_with_timeout(command, timeout).await?,
        None => connection.execute(command).await?,
    };

    let result: EvaluateResult = serde_json::from_value(raw)?;

    if let Some(details) = result.exception_details {
        let error = exception_error(details);
        debug!(error = %error, "Expression threw");
        return Err(error);
    }

    let value = remote_value(result.result);
    expression.shape.check(&value)?;
    Ok(value)
}

/// Evaluates an expression and deserializes its value.
///
/// # Errors
///
/// Same as [`execute_in_target`], plus [`Error::UnexpectedValue`] if the
/// value does not deserialize into `T`.
pub async fn evaluate_as<T: DeserializeOwned>(
    connection: &Connection,
    expression: &RemoteExpression,
    timeout: Option<Duration>,
) -> Result<T> {
    let value = execute_in_target(connection, expression, timeout).await?;
    serde_json::from_value(value.clone())
        .map_err(|e| Error::unexpected_value(type_name::<T>(), format!("{} ({e})", render(&value))))
}

/// Returns JavaScript truthiness of a JSON value.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "NaN" && s != "-0",
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn remote_value(object: RemoteObject) -> Value {
    if let Some(unserializable) = object.unserializable_value {
        return Value::String(unserializable);
    }
    if object.object_type == "undefined" {
        return Value::Null;
    }
    object.value.unwrap_or(Value::Null)
}

fn exception_error(details: ExceptionDetails) -> Error {
    let exception = details.exception.unwrap_or_default();

    let (message, stack) = match (&exception.description, &exception.value) {
        (Some(description), _) => {
            let message = description.lines().next().unwrap_or_default().to_string();
            let stack = description.contains('\n').then(|| description.clone());
            (message, stack)
        }
        (None, Some(Value::String(thrown))) => (thrown.clone(), None),
        (None, Some(thrown)) if !thrown.is_null() => (thrown.to_string(), None),
        _ => (details.text.clone(), None),
    };

    Error::ScriptEvaluation {
        message: if message.is_empty() { details.text } else { message },
        stack,
        line: details.line_number,
        column: details.column_number,
    }
}

fn render(value: &Value) -> String {
    let text = value.to_string();
    if text.len() <= MAX_RENDERED_VALUE {
        return text;
    }
    let cut = (0..=MAX_RENDERED_VALUE)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0);
    format!("{}...", &text[..cut])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;
    use serde_json::json;

    use crate::transport::MockTarget;

    /// Answers every `Runtime.evaluate` with `result`.
    async fn target_answering(result: Value) -> Connection {
        let target = MockTarget::bind().await.expect("bind");
        let url = target.ws_url();
        let _server = target.serve(move |request| {
            assert_eq!(request.method, "Runtime.evaluate");
            assert_eq!(request.params["awaitPromise"], true);
            assert_eq!(request.params["returnByValue"], true);
            vec![request.reply(result.clone())]
        });
        Connection::connect(&url).await.expect("connect")
    }

    #[test]
    fn test_call_encodes_arguments_as_json() {
        let expression = RemoteExpression::call(
            "(a, b) => a + b",
            &[json!("it's \"quoted\""), json!({"n": 1})],
        );
        assert_eq!(
            expression.source(),
            r#"((a, b) => a + b)("it's \"quoted\"", {"n":1})"#
        );
    }

    #[test]
    fn test_function_wraps_async_iife() {
        let expression = RemoteExpression::function("return 1;");
        assert!(expression.source().starts_with("(async () => {"));
        assert!(expression.source().ends_with("})()"));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!(3)));
    }

    #[tokio::test]
    async fn test_value_is_unwrapped() {
        let connection = target_answering(json!({
            "result": {"type": "number", "value": 42, "description": "42"}
        }))
        .await;

        let value = execute_in_target(&connection, &"6 * 7".into(), None)
            .await
            .expect("evaluate");
        assert_eq!(value, json!(42));
    }

    #[tokio::test]
    async fn test_undefined_is_null_not_error() {
        let connection = target_answering(json!({"result": {"type": "undefined"}})).await;

        let value = execute_in_target(&connection, &"undefined".into(), None)
            .await
            .expect("evaluate");
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_null_is_null_not_error() {
        let connection = target_answering(json!({
            "result": {"type": "object", "subtype": "null", "value": null}
        }))
        .await;

        let value = execute_in_target(&connection, &"null".into(), None)
            .await
            .expect("evaluate");
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_throw_is_script_evaluation_error() {
        let connection = target_answering(json!({
            "result": {"type": "object", "subtype": "error", "description": "Error: boom"},
            "exceptionDetails": {
                "exceptionId": 1,
                "text": "Uncaught",
                "lineNumber": 1,
                "columnNumber": 6,
                "exception": {
                    "type": "object",
                    "subtype": "error",
                    "description": "Error: boom\n    at <anonymous>:2:7"
                }
            }
        }))
        .await;

        let err = execute_in_target(&connection, &"throw new Error('boom')".into(), None)
            .await
            .expect_err("should throw");

        match err {
            Error::ScriptEvaluation {
                message,
                stack,
                line,
                column,
            } => {
                assert_eq!(message, "Error: boom");
                assert!(stack.expect("stack").contains("<anonymous>:2:7"));
                assert_eq!(line, 1);
                assert_eq!(column, 6);
            }
            other => panic!("expected ScriptEvaluation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_thrown_string_becomes_message() {
        let connection = target_answering(json!({
            "result": {"type": "string", "value": "nope"},
            "exceptionDetails": {
                "text": "Uncaught",
                "lineNumber": 0,
                "columnNumber": 0,
                "exception": {"type": "string", "value": "nope"}
            }
        }))
        .await;

        let err = execute_in_target(&connection, &"throw 'nope'".into(), None)
            .await
            .expect_err("should throw");
        assert!(matches!(err, Error::ScriptEvaluation { ref message, .. } if message == "nope"));
    }

    #[tokio::test]
    async fn test_unserializable_value_is_string() {
        let connection = target_answering(json!({
            "result": {"type": "number", "unserializableValue": "NaN", "description": "NaN"}
        }))
        .await;

        let value = execute_in_target(&connection, &"0 / 0".into(), None)
            .await
            .expect("evaluate");
        assert_eq!(value, json!("NaN"));
    }

    #[tokio::test]
    async fn test_shape_mismatch() {
        let connection = target_answering(json!({
            "result": {"type": "string", "value": "7"}
        }))
        .await;

        let expression = RemoteExpression::new("'7'").returning(ReturnShape::Number);
        let err = execute_in_target(&connection, &expression, None)
            .await
            .expect_err("should mismatch");
        assert!(matches!(err, Error::UnexpectedValue { ref expected, .. } if expected == "number"));
    }

    #[tokio::test]
    async fn test_evaluate_as() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Hint {
            text: String,
            visible: bool,
        }

        let connection = target_answering(json!({
            "result": {"type": "object", "value": [{"text": "a", "visible": true}]}
        }))
        .await;

        let hints: Vec<Hint> = evaluate_as(&connection, &"collectHints()".into(), None)
            .await
            .expect("evaluate");
        assert_eq!(
            hints,
            vec![Hint {
                text: "a".into(),
                visible: true
            }]
        );

        let err = evaluate_as::<u32>(&connection, &"collectHints()".into(), None)
            .await
            .expect_err("should not deserialize");
        assert!(matches!(err, Error::UnexpectedValue { .. }));
    }
}
