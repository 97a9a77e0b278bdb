//! CDP message types.
//!
//! This module defines the wire format spoken with every target.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Harness → Target | Command request |
//! | `Response` | Target → Harness | Command result or error |
//! | `Event` | Target → Harness | Unsolicited notification |
//!
//! # Command Naming
//!
//! Commands follow `Domain.method` format:
//!
//! - `Runtime.evaluate`
//! - `Input.dispatchKeyEvent`
//! - `Profiler.takePreciseCoverage`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions by domain |
//! | `event` | Event types |
//! | `message` | Inbound frame classification |
//! | `request` | Request and Response types |
//! | `types` | Typed command results |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by domain.
pub mod command;

/// Event message types.
pub mod event;

/// Inbound frame classification.
pub mod message;

/// Request and Response message types.
pub mod request;

/// Typed command results.
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    Command, InputCommand, KeyEventParams, KeyEventType, LogCommand, PageCommand,
    ProfilerCommand, RawCommand, RuntimeCommand,
};
pub use event::{Event, ParsedEvent, remote_object_text};
pub use message::Inbound;
pub use request::{ProtocolError, Request, Response};
pub use types::{
    CoverageRange, EvaluateResult, ExceptionDetails, FunctionCoverage, RemoteObject,
    ScriptCoverage, TakePreciseCoverageResult,
};
