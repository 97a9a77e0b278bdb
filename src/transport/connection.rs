//! WebSocket connection and event loop.
//!
//! This module handles the WebSocket connection to one CDP target,
//! including request/response correlation and event routing.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames from the target (responses, events)
//! - Outgoing commands from the Rust API
//! - Request/response correlation by per-connection integer id
//! - Delivery of events to one-shot subscribers and persistent listeners
//!
//! # Registries
//!
//! Pending requests and event subscribers live in per-connection maps.
//! Nothing is process-wide, so tests attached to several targets never
//! see each other's traffic.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, to_string};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, SubscriptionId};
use crate::protocol::{Command, Event, Inbound, RawCommand, Request};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for command execution.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 256;

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type WsSink = SplitSink<WsStream, Message>;

/// A command awaiting its response.
struct PendingRequest {
    method: String,
    response_tx: oneshot::Sender<Result<Value>>,
}

/// Map of request IDs to response channels.
type CorrelationMap = FxHashMap<RequestId, PendingRequest>;

/// Predicate deciding whether an event satisfies a subscription.
pub type EventPredicate = Box<dyn Fn(&Event) -> bool + Send + Sync>;

/// A one-shot event subscription.
struct Subscriber {
    predicate: EventPredicate,
    event_tx: oneshot::Sender<Event>,
}

type SubscriberMap = FxHashMap<SubscriptionId, Subscriber>;

/// State shared between handles and the event loop.
struct ConnectionState {
    correlation: Mutex<CorrelationMap>,
    subscribers: Mutex<SubscriberMap>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<Event>>>,
    next_request_id: AtomicU64,
    next_subscription_id: AtomicU64,
    closed: AtomicBool,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            correlation: Mutex::new(CorrelationMap::default()),
            subscribers: Mutex::new(SubscriberMap::default()),
            listeners: Mutex::new(Vec::new()),
            next_request_id: AtomicU64::new(1),
            next_subscription_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a request and wait for response.
    Send {
        request: Request,
        response_tx: oneshot::Sender<Result<Value>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(RequestId),
    /// Close the socket; acknowledged after teardown.
    Shutdown(oneshot::Sender<()>),
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to one CDP target.
///
/// Handles request/response correlation and event routing.
/// The connection spawns an internal event loop task.
///
/// # Thread Safety
///
/// `Connection` is a cheap handle: clones share the same socket, id space
/// and registries. The socket closes on [`Connection::close`] or when the
/// last handle is dropped.
#[derive(Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Registries (shared with event loop).
    state: Arc<ConnectionState>,
    /// Debugger URL this connection was opened on.
    url: Arc<str>,
    /// Per-request timeout.
    command_timeout: Duration,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Opens a connection to a target's debugger WebSocket.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the handshake takes longer than 10s
    /// - [`Error::Connection`] if the endpoint is unreachable or refuses
    pub async fn connect(ws_url: &str) -> Result<Self> {
        Self::connect_with_timeout(ws_url, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Opens a connection with a custom handshake timeout.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::connect`].
    pub async fn connect_with_timeout(ws_url: &str, connect_timeout: Duration) -> Result<Self> {
        debug!(url = ws_url, "Connecting to target");

        let (ws_stream, _) = timeout(connect_timeout, connect_async(ws_url))
            .await
            .map_err(|_| Error::connection_timeout(connect_timeout.as_millis() as u64))?
            .map_err(|e| Error::connection(format!("{ws_url}: {e}")))?;

        debug!(url = ws_url, "Connected to target");

        Ok(Self::new(ws_stream, ws_url))
    }

    /// Creates a new connection from a WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    fn new(ws_stream: WsStream, url: &str) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state = Arc::new(ConnectionState::new());

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&state),
        ));

        Self {
            command_tx,
            state,
            url: Arc::from(url),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Sets the per-request timeout used by [`Connection::send`].
    #[inline]
    #[must_use]
    pub fn with_command_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    /// Returns the debugger URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the per-request timeout.
    #[inline]
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Returns `true` once the socket is closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.correlation.lock().len()
    }

    /// Returns the number of registered one-shot subscribers.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.subscribers.lock().len()
    }
}

// ============================================================================
// Connection - Commands
// ============================================================================

impl Connection {
    /// Sends a command by method name and waits for its result.
    ///
    /// Concurrent calls are legal; each resolves with the response carrying
    /// its own id regardless of arrival order.
    ///
    /// # Errors
    ///
    /// - [`Error::Cdp`] if the target answered with an error object
    /// - [`Error::ConnectionClosed`] if the connection is or becomes closed
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Protocol`] if too many requests are pending
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.execute(Command::Raw(RawCommand::new(method, params)))
            .await
    }

    /// Sends a typed command and waits for its result.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::send`].
    pub async fn execute(&self, command: Command) -> Result<Value> {
        self.execute_with_timeout(command, self.command_timeout)
            .await
    }

    /// Sends a typed command with a custom timeout.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::send`].
    pub async fn execute_with_timeout(
        &self,
        command: Command,
        request_timeout: Duration,
    ) -> Result<Value> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        // Check pending request limit
        {
            let correlation = self.state.correlation.lock();
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::protocol(format!(
                    "Too many pending requests: {}/{}",
                    correlation.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
        }

        let request_id = RequestId::new(self.state.next_request_id.fetch_add(1, Ordering::Relaxed));
        let method = command.method().to_string();
        let request = Request::new(request_id, command);

        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send {
                request,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                // Timeout - clean up correlation entry
                let _ = self
                    .command_tx
                    .send(ConnectionCommand::RemoveCorrelation(request_id));

                Err(Error::request_timeout(
                    request_id,
                    method,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Closes the connection.
    ///
    /// Pending requests reject with [`Error::ConnectionClosed`] and every
    /// subscription is discarded. Closing an already closed connection is
    /// a no-op.
    pub async fn close(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self
            .command_tx
            .send(ConnectionCommand::Shutdown(ack_tx))
            .is_ok()
        {
            let _ = ack_rx.await;
        }
    }
}

// ============================================================================
// Connection - Events
// ============================================================================

impl Connection {
    /// Registers a one-shot event subscription.
    ///
    /// The predicate is registered immediately, so events caused by commands
    /// sent after this call are never missed. The first event for which the
    /// predicate holds resolves the returned [`Subscription`]; other
    /// subscriptions see the same event independently.
    pub fn on<P>(&self, predicate: P) -> Subscription
    where
        P: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        let id = SubscriptionId::new(
            self.state
                .next_subscription_id
                .fetch_add(1, Ordering::Relaxed),
        );
        let (event_tx, event_rx) = oneshot::channel();

        {
            let mut subscribers = self.state.subscribers.lock();
            if !self.state.closed.load(Ordering::Acquire) {
                subscribers.insert(
                    id,
                    Subscriber {
                        predicate: Box::new(predicate),
                        event_tx,
                    },
                );
            }
        }

        trace!(%id, "Event subscription registered");

        Subscription {
            id,
            event_rx,
            state: Arc::clone(&self.state),
        }
    }

    /// Registers a one-shot subscription for the next event with `method`.
    pub fn on_method(&self, method: impl Into<String>) -> Subscription {
        let method = method.into();
        self.on(move |event| event.method == method)
    }

    /// Waits for the first event matching `predicate`.
    ///
    /// # Errors
    ///
    /// - [`Error::WaitTimeout`] if no matching event arrives in time
    /// - [`Error::ConnectionClosed`] if the connection closes first
    pub async fn wait_for_event<P>(&self, predicate: P, wait_timeout: Duration) -> Result<Event>
    where
        P: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.on(predicate).recv_timeout(wait_timeout).await
    }

    /// Returns a receiver for every event on this connection.
    ///
    /// The receiver yields `None` once the connection closes.
    #[must_use]
    pub fn event_stream(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut listeners = self.state.listeners.lock();
        if !self.state.closed.load(Ordering::Acquire) {
            listeners.push(tx);
        }
        rx
    }
}

// ============================================================================
// Connection - Event Loop
// ============================================================================

impl Connection {
    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        state: Arc<ConnectionState>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut shutdown_ack = None;

        loop {
            tokio::select! {
                // Incoming frames from the target
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &state);
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from Rust API
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { request, response_tx }) => {
                            Self::handle_send_command(
                                request,
                                response_tx,
                                &mut ws_write,
                                &state,
                            ).await;
                        }

                        Some(ConnectionCommand::RemoveCorrelation(request_id)) => {
                            state.correlation.lock().remove(&request_id);
                            debug!(%request_id, "Removed timed-out correlation");
                        }

                        Some(ConnectionCommand::Shutdown(ack)) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            shutdown_ack = Some(ack);
                            break;
                        }

                        None => {
                            debug!("All connection handles dropped");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        Self::teardown(&state);

        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }

        debug!("Event loop terminated");
    }

    /// Handles an incoming text frame from the target.
    fn handle_incoming_message(text: &str, state: &ConnectionState) {
        match Inbound::parse(text) {
            Ok(Inbound::Response(response)) => {
                let pending = state.correlation.lock().remove(&response.id);

                if let Some(pending) = pending {
                    trace!(id = %response.id, method = %pending.method, "Response received");
                    let result = response.into_result(&pending.method);
                    let _ = pending.response_tx.send(result);
                } else {
                    warn!(id = %response.id, "Response for unknown request");
                }
            }

            Ok(Inbound::Event(event)) => Self::dispatch_event(event, state),

            Ok(Inbound::Malformed { id, reason }) => {
                let pending = state.correlation.lock().remove(&id);

                if let Some(pending) = pending {
                    warn!(%id, method = %pending.method, %reason, "Unreadable response");
                    let _ = pending.response_tx.send(Err(Error::protocol(format!(
                        "Unreadable response to {}: {reason}",
                        pending.method
                    ))));
                } else {
                    warn!(%id, %reason, "Unreadable response for unknown request");
                }
            }

            Err(e) => warn!(error = %e, "Failed to parse incoming message"),
        }
    }

    /// Offers an event to every subscriber and listener.
    fn dispatch_event(event: Event, state: &ConnectionState) {
        trace!(method = %event.method, "Event received");

        let matched: Vec<Subscriber> = {
            let mut subscribers = state.subscribers.lock();
            subscribers.retain(|_, subscriber| !subscriber.event_tx.is_closed());

            let ids: Vec<SubscriptionId> = subscribers
                .iter()
                .filter(|(_, subscriber)| (subscriber.predicate)(&event))
                .map(|(id, _)| *id)
                .collect();

            ids.iter().filter_map(|id| subscribers.remove(id)).collect()
        };

        for subscriber in matched {
            let _ = subscriber.event_tx.send(event.clone());
        }

        state
            .listeners
            .lock()
            .retain(|listener| listener.send(event.clone()).is_ok());
    }

    /// Handles a send command from the Rust API.
    async fn handle_send_command(
        request: Request,
        response_tx: oneshot::Sender<Result<Value>>,
        ws_write: &mut WsSink,
        state: &ConnectionState,
    ) {
        let request_id = request.id;

        // Serialize request
        let json = match to_string(&request) {
            Ok(j) => j,
            Err(e) => {
                let _ = response_tx.send(Err(Error::Json(e)));
                return;
            }
        };

        // Store correlation before sending
        state.correlation.lock().insert(
            request_id,
            PendingRequest {
                method: request.method().to_string(),
                response_tx,
            },
        );

        // Send over WebSocket
        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
            // Remove correlation and notify caller
            if let Some(pending) = state.correlation.lock().remove(&request_id) {
                let _ = pending.response_tx.send(Err(Error::connection(e.to_string())));
            }
        }

        trace!(%request_id, "Request sent");
    }

    /// Marks the connection closed and rejects all outstanding work.
    fn teardown(state: &ConnectionState) {
        let pending: Vec<_> = {
            let mut subscribers = state.subscribers.lock();
            state.closed.store(true, Ordering::Release);
            subscribers.clear();
            state.listeners.lock().clear();
            state.correlation.lock().drain().collect()
        };

        let count = pending.len();
        for (_, pending) in pending {
            let _ = pending.response_tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A pending one-shot event subscription.
///
/// Dropping the subscription unregisters it, so a timed-out wait leaves
/// nothing behind in the connection's registry.
pub struct Subscription {
    id: SubscriptionId,
    event_rx: oneshot::Receiver<Event>,
    state: Arc<ConnectionState>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Returns the subscription id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the matching event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection closes first.
    pub async fn recv(mut self) -> Result<Event> {
        (&mut self.event_rx)
            .await
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Waits for the matching event, giving up after `wait_timeout`.
    ///
    /// # Errors
    ///
    /// - [`Error::WaitTimeout`] if no matching event arrives in time
    /// - [`Error::ConnectionClosed`] if the connection closes first
    pub async fn recv_timeout(mut self, wait_timeout: Duration) -> Result<Event> {
        match timeout(wait_timeout, &mut self.event_rx).await {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => Err(Error::wait_timeout(
                "CDP event",
                wait_timeout.as_millis() as u64,
                "no matching event received",
            )),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.state.subscribers.lock().remove(&self.id);
    }
}

// ============================================================================
// Tests
// ============================================================================
