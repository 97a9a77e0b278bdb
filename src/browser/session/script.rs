//! Remote evaluation methods.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::browser::script::{RemoteExpression, evaluate_as, execute_in_target, is_truthy};
use crate::browser::wait::poll_until;
use crate::error::Result;

use super::TargetSession;

// ============================================================================
// TargetSession - Script Execution
// ============================================================================

impl TargetSession {
    /// Evaluates an expression and returns its JSON value.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let title = page.evaluate("document.title").await?;
    /// ```
    pub async fn evaluate(&self, expression: impl Into<RemoteExpression>) -> Result<Value> {
        let expression = expression.into();
        execute_in_target(
            self.connection(),
            &expression,
            self.options().script_timeout,
        )
        .await
    }

    /// Evaluates an expression and deserializes its value.
    pub async fn evaluate_as<T: DeserializeOwned>(
        &self,
        expression: impl Into<RemoteExpression>,
    ) -> Result<T> {
        let expression = expression.into();
        evaluate_as(
            self.connection(),
            &expression,
            self.options().script_timeout,
        )
        .await
    }

    /// Polls an expression until its value is truthy, and returns it.
    ///
    /// Evaluation errors (for example a DOM that is not ready yet) are
    /// retried until the session's wait timeout.
    pub async fn wait_for_script(&self, expression: impl Into<RemoteExpression>) -> Result<Value> {
        let expression = expression.into();
        let options = self.options();

        debug!(source = expression.source(), "Waiting for script");

        poll_until(
            &format!("script {}", expression.source()),
            || {
                let connection = self.connection().clone();
                let expression = expression.clone();
                let timeout = options.script_timeout;
                async move {
                    let value = execute_in_target(&connection, &expression, timeout).await?;
                    Ok(is_truthy(&value).then_some(value))
                }
            },
            options.wait,
        )
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================
