//! Target automation module.
//!
//! This module provides what a test does with an attached target:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TargetSession`] | Attached target with scripting, input and page helpers |
//! | [`RemoteExpression`] | Script source plus expected [`ReturnShape`] |
//! | [`KeyStroke`] | Resolved key token (`"Ctrl+Shift+k"`) |
//! | [`WaitOptions`] | Timeout and interval of polling waits |
//! | [`CoverageCollector`] | Per-test precise coverage deltas |
//! | [`ConsoleCapture`] | Console and log recording |
//!
//! # Example
//!
//! ```no_run
//! use cdp_harness::{Connection, RemoteExpression, ReturnShape, Result, execute_in_target};
//!
//! # async fn example(connection: Connection) -> Result<()> {
//! let count = RemoteExpression::new("document.querySelectorAll('.hint').length")
//!     .returning(ReturnShape::Number);
//! let value = execute_in_target(&connection, &count, None).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Console and log capture.
pub mod console;

/// Precise JavaScript coverage.
pub mod coverage;

/// Keyboard input dispatch.
pub mod input;

/// Key token parsing and layout.
pub mod keyboard;

/// Remote script evaluation.
pub mod script;

/// Attached target sessions.
pub mod session;

/// Polling and event waits.
pub mod wait;

// ============================================================================
// Re-exports
// ============================================================================

pub use console::{ConsoleCapture, ConsoleEntry, EntryKind};
pub use coverage::{CoverageCollector, CoverageDelta, CoverageReport, CoverageSnapshot, RangeSet};
pub use input::{insert_text, send_key, send_keys, type_text};
pub use keyboard::{Key, KeyStroke, Modifiers};
pub use script::{RemoteExpression, ReturnShape, evaluate_as, execute_in_target, is_truthy};
pub use session::{SessionOptions, TargetSession};
pub use wait::{WaitOptions, poll_until, wait_for, wait_for_cdp_event};
