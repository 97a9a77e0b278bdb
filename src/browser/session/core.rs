//! Core TargetSession struct and accessors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::browser::wait::WaitOptions;
use crate::discovery::Target;
use crate::error::Result;
use crate::identifiers::ExtensionId;
use crate::transport::Connection;

// ============================================================================
// Types
// ============================================================================

/// Defaults applied by session helpers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Timeout and interval of waits.
    pub wait: WaitOptions,
    /// Delay between `keyDown` and `keyUp`, and after each key of a sequence.
    pub key_delay: Option<Duration>,
    /// Timeout of one script evaluation; the connection default when `None`.
    pub script_timeout: Option<Duration>,
}

/// Internal shared state for a session.
pub(crate) struct SessionInner {
    /// Target the session is attached to.
    pub target: Target,
    /// Open connection to the target.
    pub connection: Connection,
    /// Helper defaults.
    pub options: SessionOptions,
}

// ============================================================================
// TargetSession
// ============================================================================

/// A handle to an attached target.
///
/// Sessions provide methods for scripting, input and page control.
#[derive(Clone)]
pub struct TargetSession {
    pub(crate) inner: Arc<SessionInner>,
}

impl fmt::Debug for TargetSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetSession")
            .field("target_id", &self.inner.target.id)
            .field("target_type", &self.inner.target.target_type)
            .field("url", &self.inner.target.url)
            .finish_non_exhaustive()
    }
}

impl TargetSession {
    /// Creates a session over an already open connection.
    #[must_use]
    pub fn new(target: Target, connection: Connection, options: SessionOptions) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                target,
                connection,
                options,
            }),
        }
    }

    /// Opens a connection to `target` and wraps it in a session.
    ///
    /// # Errors
    ///
    /// - [`Error::TargetNotFound`](crate::Error::TargetNotFound) if the target has no debugger socket
    /// - Any connection error
    pub async fn attach(target: Target, options: SessionOptions) -> Result<Self> {
        let connection = Connection::connect(target.debugger_url()?).await?;
        debug!(id = %target.id, url = %target.url, "Attached to target");
        Ok(Self::new(target, connection, options))
    }
}

// ============================================================================
// TargetSession - Accessors
// ============================================================================

impl TargetSession {
    /// Returns the target descriptor.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    /// Returns the connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// Returns the helper defaults.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    /// Returns the extension id when the target is an extension resource.
    #[inline]
    #[must_use]
    pub fn extension_id(&self) -> Option<ExtensionId> {
        self.inner.target.extension_id()
    }

    /// Closes the connection. Closing twice is a no-op.
    pub async fn close(&self) {
        self.inner.connection.close().await;
    }
}

// ============================================================================
// Test Support
// ============================================================================

/// Attaches a session to a mock target answering with `handler`.
#[cfg(test)]
pub(crate) async fn mock_session<F>(handler: F) -> TargetSession
where
    F: FnMut(&crate::transport::MockRequest) -> Vec<serde_json::Value> + Send + 'static,
{
    let server = crate::transport::MockTarget::bind().await.expect("bind");
    let target: Target = serde_json::from_value(serde_json::json!({
        "id": "mock",
        "type": "page",
        "url": "http://localhost/fixture.html",
        "webSocketDebuggerUrl": server.ws_url()
    }))
    .expect("target");
    let _task = server.serve(handler);

    let options = SessionOptions {
        wait: WaitOptions::new(Duration::from_secs(2), Duration::from_millis(10)),
        ..SessionOptions::default()
    };
    TargetSession::attach(target, options).await.expect("attach")
}

// ============================================================================
// Tests
// ============================================================================
