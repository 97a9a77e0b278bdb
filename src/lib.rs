//! CDP Harness - End-to-end testing of browser extensions over the
//! Chrome DevTools Protocol.
//!
//! This library attaches to a browser started with remote debugging and
//! drives the extension's targets (background worker, UI frame, content
//! pages) the way a test needs to.
//!
//! # Architecture
//!
//! The harness follows a client model:
//!
//! - **Discovery (HTTP)**: Lists targets from `/json` and picks the one a test needs
//! - **Connection (WebSocket)**: One per target, correlating commands and fanning out events
//!
//! Key design principles:
//!
//! - Each [`Connection`] owns: WebSocket + event loop task + its own registries
//! - Request ids are unique per connection, never global
//! - Waits are either polling probes or event predicates (no fixed sleeps)
//! - Coverage is recorded per test as a delta of executed byte ranges
//!
//! # Quick Start
//!
//! ```no_run
//! use cdp_harness::{Harness, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let harness = Harness::builder()
//!         .port(9222)
//!         .extension_id("abcdefghijklmnopabcdefghijklmnop")
//!         .build()?;
//!
//!     // Press keys in a content page
//!     let page = harness.content_page("fixture.html").await?;
//!     page.bring_to_front().await?;
//!     page.send_keys(&["t", "ArrowDown", "Enter"]).await?;
//!
//!     // Ask the background worker what happened
//!     let background = harness.background().await?;
//!     let count = background
//!         .evaluate("chrome.tabs.query({}).then(tabs => tabs.length)")
//!         .await?;
//!     println!("Open tabs: {count}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | Sessions, scripts, keys, waits, coverage, console |
//! | [`discovery`] | Target listing and lookup over HTTP |
//! | [`driver`] | [`Harness`] entry point and configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | CDP message types |
//! | [`transport`] | WebSocket connection and mock target |

// ============================================================================
// Modules
// ============================================================================

/// Target automation: sessions, scripts, input, waits, coverage.
///
/// - [`TargetSession`] - Attached target with helpers
/// - [`CoverageCollector`] - Per-test coverage deltas
/// - [`ConsoleCapture`] - Console recording
pub mod browser;

/// Target discovery over the remote debugging HTTP endpoint.
pub mod discovery;

/// Harness entry point and configuration.
///
/// Use [`Harness::builder()`] to create a configured harness.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// CDP message types.
///
/// Commands, responses, events and the result payloads the harness reads.
pub mod protocol;

/// WebSocket transport layer.
///
/// Connection event loop plus a scriptable mock target for tests.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{
    ConsoleCapture, ConsoleEntry, CoverageCollector, CoverageDelta, CoverageReport, Key,
    KeyStroke, Modifiers, RangeSet, RemoteExpression, ReturnShape, SessionOptions, TargetSession,
    WaitOptions, evaluate_as, execute_in_target, poll_until, wait_for, wait_for_cdp_event,
};

// Discovery types
pub use discovery::{Discovery, Target, TargetType};

// Driver types
pub use driver::{Harness, HarnessBuilder, HarnessOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ExtensionId, RequestId, SubscriptionId, TargetId};

// Transport types
pub use transport::{Connection, Subscription};
