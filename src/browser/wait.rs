//! Condition waiting without fixed sleeps.
//!
//! Two strategies cover every asynchronous state change:
//!
//! | Strategy | Function | Use |
//! |----------|----------|-----|
//! | Polling | [`wait_for`], [`poll_until`] | State observable by probing (DOM, storage) |
//! | Event | [`wait_for_cdp_event`] | State announced by a CDP event |
//!
//! Polling evaluates the probe immediately, then every `interval`, and is
//! bounded by one overall deadline: a probe that itself hangs is cut off
//! when the deadline passes.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::Event;
use crate::transport::Connection;

// ============================================================================
// Constants
// ============================================================================

/// Default overall timeout of a wait.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay between two probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// WaitOptions
// ============================================================================

/// Timeout and polling interval of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Overall deadline.
    pub timeout: Duration,
    /// Delay between probes.
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitOptions {
    /// Creates options with explicit values.
    #[inline]
    #[must_use]
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Replaces the overall deadline.
    #[inline]
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the polling interval.
    #[inline]
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

// ============================================================================
// Polling
// ============================================================================

/// Polls `probe` until it yields a value.
///
/// The probe returns `Ok(Some(value))` when the condition holds and
/// `Ok(None)` when it does not yet. Recoverable errors (see
/// [`Error::is_recoverable`]) are recorded as the last observed state and
/// the probe is retried; any other error aborts the wait.
///
/// # Errors
///
/// - [`Error::WaitTimeout`] carrying `operation` and the last observed state
/// - Any non-recoverable error returned by the probe
pub async fn poll_until<T, F, Fut>(operation: &str, mut probe: F, options: WaitOptions) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let mut attempts: u32 = 0;
    let mut last_state = String::from("never evaluated");

    let outcome = timeout(options.timeout, async {
        loop {
            attempts += 1;
            match probe().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {
                    last_state = format!("condition false after {attempts} attempt(s)");
                }
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) => {
                    trace!(operation, error = %e, "Probe failed, retrying");
                    last_state = format!("attempt {attempts} failed: {e}");
                }
            }
            sleep(options.interval).await;
        }
    })
    .await;

    match outcome {
        Ok(result) => result,
        Err(_) => {
            debug!(operation, attempts, %last_state, "Wait timed out");
            Err(Error::wait_timeout(
                operation,
                options.timeout.as_millis() as u64,
                last_state,
            ))
        }
    }
}

/// Waits until `predicate` returns `true`.
///
/// # Errors
///
/// Returns [`Error::WaitTimeout`] if the predicate stays false.
pub async fn wait_for<F, Fut>(operation: &str, mut predicate: F, options: WaitOptions) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    poll_until(
        operation,
        || {
            let check = predicate();
            async move { Ok(check.await.then_some(())) }
        },
        options,
    )
    .await
}

// ============================================================================
// Events
// ============================================================================

/// Waits for the first event on `connection` matching `predicate`.
///
/// The subscription is registered before this function first yields, and
/// removed on timeout.
///
/// # Errors
///
/// - [`Error::WaitTimeout`] if no matching event arrives in time
/// - [`Error::ConnectionClosed`] if the connection closes first
pub async fn wait_for_cdp_event<P>(
    connection: &Connection,
    predicate: P,
    wait_timeout: Duration,
) -> Result<Event>
where
    P: Fn(&Event) -> bool + Send + Sync + 'static,
{
    connection.wait_for_event(predicate, wait_timeout).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::json;
    use tokio::time::Instant;

    use crate::transport::{MockTarget, mock_event};

    fn fast() -> WaitOptions {
        WaitOptions::new(Duration::from_millis(200), Duration::from_millis(10))
    }

    #[test]
    fn test_defaults() {
        let options = WaitOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.interval, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_already_true_returns_immediately() {
        let options = WaitOptions::new(Duration::from_secs(2), Duration::from_secs(1));
        let start = Instant::now();

        wait_for("ready", || async { true }, options)
            .await
            .expect("wait");

        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_counter_reaches_threshold() {
        let counter = Arc::new(AtomicU32::new(0));
        let ticker = Arc::clone(&counter);
        let task = tokio::spawn(async move {
            loop {
                sleep(Duration::from_millis(40)).await;
                ticker.fetch_add(1, Ordering::SeqCst);
            }
        });

        let start = Instant::now();
        let options = WaitOptions::new(Duration::from_secs(2), Duration::from_millis(10));
        wait_for(
            "counter >= 3",
            || {
                let counter = Arc::clone(&counter);
                async move { counter.load(Ordering::SeqCst) >= 3 }
            },
            options,
        )
        .await
        .expect("wait");

        assert!(counter.load(Ordering::SeqCst) >= 3);
        assert!(start.elapsed() < Duration::from_secs(2));
        task.abort();
    }

    #[tokio::test]
    async fn test_false_predicate_times_out() {
        let err = wait_for("never", || async { false }, fast())
            .await
            .expect_err("should time out");

        match err {
            Error::WaitTimeout {
                operation,
                timeout_ms,
                last_state,
            } => {
                assert_eq!(operation, "never");
                assert_eq!(timeout_ms, 200);
                assert!(last_state.contains("condition false"));
            }
            other => panic!("expected WaitTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hanging_predicate_is_cut_off() {
        let start = Instant::now();
        let err = wait_for("hang", || std::future::pending::<bool>(), fast())
            .await
            .expect_err("should time out");

        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_poll_until_retries_recoverable_errors() {
        let attempts = AtomicU32::new(0);

        let value = poll_until(
            "script settles",
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Error::script_evaluation("document.body is null"))
                    } else {
                        Ok(Some(n))
                    }
                }
            },
            fast(),
        )
        .await
        .expect("poll");

        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_poll_until_records_last_error() {
        let err = poll_until::<(), _, _>(
            "always throws",
            || async { Err(Error::script_evaluation("not ready")) },
            fast(),
        )
        .await
        .expect_err("should time out");

        assert!(matches!(err, Error::WaitTimeout { ref last_state, .. } if last_state.contains("not ready")));
    }

    #[tokio::test]
    async fn test_poll_until_aborts_on_connection_error() {
        let attempts = AtomicU32::new(0);

        let err = poll_until::<(), _, _>(
            "connection lost",
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::ConnectionClosed) }
            },
            fast(),
        )
        .await
        .expect_err("should abort");

        assert!(matches!(err, Error::ConnectionClosed));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_poll_until_aborts_on_deterministic_error() {
        let attempts = AtomicU32::new(0);

        let err = poll_until::<(), _, _>(
            "bad key",
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::unknown_key("Hyperspace")) }
            },
            fast(),
        )
        .await
        .expect_err("should abort");

        assert!(matches!(err, Error::UnknownKey { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_poll_until_retries_cdp_errors() {
        let attempts = AtomicU32::new(0);

        let value = poll_until(
            "context ready",
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(Error::cdp("Runtime.evaluate", -32000, "Cannot find context", None))
                    } else {
                        Ok(Some(n))
                    }
                }
            },
            fast(),
        )
        .await
        .expect("poll");

        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_wait_for_cdp_event_ignores_non_matching() {
        let target = MockTarget::bind().await.expect("bind");
        let url = target.ws_url();
        let _server = target.serve(|request| {
            vec![
                mock_event("Runtime.consoleAPICalled", json!({"type": "log", "n": 1})),
                mock_event("Runtime.consoleAPICalled", json!({"type": "error", "n": 2})),
                request.reply(json!({})),
            ]
        });
        let connection = Connection::connect(&url).await.expect("connect");

        let waiting = connection.clone();
        let wait = tokio::spawn(async move {
            wait_for_cdp_event(
                &waiting,
                |event| event.is("Runtime.consoleAPICalled") && event.params["type"] == "error",
                Duration::from_secs(2),
            )
            .await
        });

        // Let the subscription register before triggering the events.
        wait_for(
            "subscribed",
            || {
                let connection = connection.clone();
                async move { connection.subscriber_count() == 1 }
            },
            fast(),
        )
        .await
        .expect("subscribed");
        connection.send("Test.emit", json!({})).await.expect("send");

        let event = wait.await.expect("join").expect("event");
        assert_eq!(event.params["n"], 2);
    }

    #[tokio::test]
    async fn test_wait_for_cdp_event_timeout_removes_subscriber() {
        let target = MockTarget::bind().await.expect("bind");
        let url = target.ws_url();
        let _server = target.serve(|request| vec![request.reply(json!({}))]);
        let connection = Connection::connect(&url).await.expect("connect");

        let err = wait_for_cdp_event(&connection, |_| true, Duration::from_millis(30))
            .await
            .expect_err("should time out");

        assert!(matches!(err, Error::WaitTimeout { .. }));
        assert_eq!(connection.subscriber_count(), 0);
    }
}
