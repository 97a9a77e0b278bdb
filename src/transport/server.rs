//! Scriptable CDP target for tests.
//!
//! [`MockTarget`] binds a WebSocket server on localhost that speaks the CDP
//! framing, so harness code can be exercised without a browser.
//!
//! # Connection Flow
//!
//! 1. `MockTarget::bind` binds `127.0.0.1:0` (random port)
//! 2. The harness connects to [`MockTarget::ws_url`]
//! 3. `MockTarget::accept` upgrades the socket and returns a [`MockPeer`]
//! 4. The test reads requests and writes responses/events in any order
//!
//! For simple request/response scripting, [`MockTarget::serve`] runs a
//! handler for every request on a background task.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for waiting for the harness to connect.
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// MockTarget
// ============================================================================

/// A bound, not yet connected, mock CDP target.
///
/// # Example
///
/// ```no_run
/// use cdp_harness::Connection;
/// use cdp_harness::transport::MockTarget;
/// use serde_json::json;
///
/// # async fn example() -> cdp_harness::Result<()> {
/// let target = MockTarget::bind().await?;
/// let url = target.ws_url();
/// let _server = target.serve(|request| vec![request.reply(json!({"ok": true}))]);
///
/// let connection = Connection::connect(&url).await?;
/// let result = connection.send("Page.bringToFront", json!({})).await?;
/// assert_eq!(result["ok"], true);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockTarget {
    /// TCP listener for the incoming connection.
    listener: TcpListener,
    /// Port the server is bound to.
    port: u16,
}

impl MockTarget {
    /// Binds a mock target on a random localhost port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind() -> Result<Self> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        debug!(port, "Mock target bound");

        Ok(Self { listener, port })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the debugger WebSocket URL of this target.
    ///
    /// Format: `ws://127.0.0.1:{port}/devtools/page/mock`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/devtools/page/mock", self.port)
    }

    /// Accepts the harness connection and upgrades it to WebSocket.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if nobody connects within 10s
    /// - [`Error::Connection`] if the WebSocket upgrade fails
    pub async fn accept(self) -> Result<MockPeer> {
        let (stream, addr) = timeout(ACCEPT_TIMEOUT, self.listener.accept())
            .await
            .map_err(|_| Error::connection_timeout(ACCEPT_TIMEOUT.as_millis() as u64))??;

        debug!(?addr, "Mock target accepted TCP connection");

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        info!(port = self.port, "Mock target connected");

        Ok(MockPeer { ws })
    }

    /// Accepts one connection and answers every request with `handler`.
    ///
    /// The handler returns the frames to send back, in order: usually a
    /// [`MockRequest::reply`], optionally preceded by [`mock_event`] frames.
    pub fn serve<F>(self, mut handler: F) -> JoinHandle<Result<()>>
    where
        F: FnMut(&MockRequest) -> Vec<Value> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut peer = self.accept().await?;
            while let Some(request) = peer.next_request().await? {
                for frame in handler(&request) {
                    peer.send(frame).await?;
                }
            }
            Ok(())
        })
    }
}

// ============================================================================
// MockPeer
// ============================================================================

/// The target side of an accepted connection.
#[derive(Debug)]
pub struct MockPeer {
    ws: WebSocketStream<TcpStream>,
}

impl MockPeer {
    /// Reads the next command sent by the harness.
    ///
    /// Returns `None` once the harness has closed or dropped the socket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the harness sent a malformed command.
    pub async fn next_request(&mut self) -> Result<Option<MockRequest>> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return MockRequest::parse(&text).map(Some),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Err(e)) => {
                    debug!(error = %e, "Mock peer read failed");
                    return Ok(None);
                }
                Some(Ok(_)) => {}
            }
        }
    }

    /// Sends one JSON frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] if the write fails.
    pub async fn send(&mut self, frame: Value) -> Result<()> {
        self.ws.send(Message::Text(frame.to_string().into())).await?;
        Ok(())
    }

    /// Sends a success response to `request`.
    pub async fn reply(&mut self, request: &MockRequest, result: Value) -> Result<()> {
        self.send(request.reply(result)).await
    }

    /// Sends an event frame.
    pub async fn emit(&mut self, method: &str, params: Value) -> Result<()> {
        self.send(mock_event(method, params)).await
    }

    /// Closes the socket from the target side.
    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}

// ============================================================================
// MockRequest
// ============================================================================

/// A command as received by the mock target.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    /// Request id.
    pub id: u64,
    /// `Domain.method` name.
    pub method: String,
    /// Parameters (`Null` when absent).
    pub params: Value,
}

impl MockRequest {
    fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let id = value
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::protocol(format!("request without id: {text}")))?;
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::protocol(format!("request without method: {text}")))?
            .to_string();
        let params = value.get("params").cloned().unwrap_or(Value::Null);

        Ok(Self { id, method, params })
    }

    /// Builds a success response frame.
    #[must_use]
    pub fn reply(&self, result: Value) -> Value {
        json!({ "id": self.id, "result": result })
    }

    /// Builds an error response frame.
    #[must_use]
    pub fn error(&self, code: i64, message: &str) -> Value {
        json!({ "id": self.id, "error": { "code": code, "message": message } })
    }
}

/// Builds an event frame.
#[must_use]
pub fn mock_event(method: &str, params: Value) -> Value {
    json!({ "method": method, "params": params })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_random_port() {
        let target = MockTarget::bind().await.expect("bind should succeed");

        assert!(target.port() > 0);
        assert_eq!(
            target.ws_url(),
            format!("ws://127.0.0.1:{}/devtools/page/mock", target.port())
        );
    }

    #[test]
    fn test_request_parse_and_frames() {
        let request =
            MockRequest::parse(r#"{"id": 3, "method": "Page.enable"}"#).expect("parse");
        assert_eq!(request.id, 3);
        assert_eq!(request.params, Value::Null);

        assert_eq!(request.reply(json!({})), json!({"id": 3, "result": {}}));
        assert_eq!(
            request.error(-32000, "nope"),
            json!({"id": 3, "error": {"code": -32000, "message": "nope"}})
        );
    }

    #[test]
    fn test_request_parse_rejects_missing_id() {
        assert!(MockRequest::parse(r#"{"method": "Page.enable"}"#).is_err());
    }
}
