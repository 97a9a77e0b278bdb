//! Command definitions organized by CDP domain.
//!
//! Commands follow the `Domain.method` naming of the DevTools protocol.
//!
//! # Command Domains
//!
//! | Domain | Commands |
//! |--------|----------|
//! | `Runtime` | Enable, evaluate |
//! | `Input` | Key events, text insertion |
//! | `Page` | Focus, navigation, reload |
//! | `Profiler` | Precise coverage |
//! | `Log` | Browser log entries |
//!
//! Anything not modelled here goes through [`RawCommand`].

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by domain.
///
/// This enum wraps domain-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Runtime domain commands.
    Runtime(RuntimeCommand),
    /// Input domain commands.
    Input(InputCommand),
    /// Page domain commands.
    Page(PageCommand),
    /// Profiler domain commands.
    Profiler(ProfilerCommand),
    /// Log domain commands.
    Log(LogCommand),
    /// Untyped command.
    Raw(RawCommand),
}

impl Command {
    /// Returns the `Domain.method` name of the command.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Runtime(command) => command.method(),
            Self::Input(command) => command.method(),
            Self::Page(command) => command.method(),
            Self::Profiler(command) => command.method(),
            Self::Log(command) => command.method(),
            Self::Raw(command) => &command.method,
        }
    }
}

// ============================================================================
// Runtime Commands
// ============================================================================

/// Runtime domain commands for script evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RuntimeCommand {
    /// Enable runtime events (console, exceptions, contexts).
    #[serde(rename = "Runtime.enable")]
    Enable,

    /// Evaluate an expression in the target's global context.
    #[serde(rename = "Runtime.evaluate")]
    Evaluate {
        /// JavaScript source.
        expression: String,
        /// Wait for a returned promise to settle.
        #[serde(rename = "awaitPromise")]
        await_promise: bool,
        /// Return the result serialized by value.
        #[serde(rename = "returnByValue")]
        return_by_value: bool,
        /// Treat the evaluation as initiated by a user gesture.
        #[serde(rename = "userGesture")]
        user_gesture: bool,
    },
}

impl RuntimeCommand {
    /// Returns the method name.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Enable => "Runtime.enable",
            Self::Evaluate { .. } => "Runtime.evaluate",
        }
    }
}

// ============================================================================
// Input Commands
// ============================================================================

/// Input domain commands for keyboard simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum InputCommand {
    /// Dispatch one key event.
    #[serde(rename = "Input.dispatchKeyEvent")]
    DispatchKeyEvent(KeyEventParams),

    /// Insert text as if typed by an IME.
    #[serde(rename = "Input.insertText")]
    InsertText {
        /// Text to insert.
        text: String,
    },
}

impl InputCommand {
    /// Returns the method name.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::DispatchKeyEvent(_) => "Input.dispatchKeyEvent",
            Self::InsertText { .. } => "Input.insertText",
        }
    }
}

/// Kind of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEventType {
    /// Key pressed; generates text when `text` is set.
    #[serde(rename = "keyDown")]
    KeyDown,
    /// Key released.
    #[serde(rename = "keyUp")]
    KeyUp,
    /// Key pressed without text generation.
    #[serde(rename = "rawKeyDown")]
    RawKeyDown,
    /// Character input.
    #[serde(rename = "char")]
    Char,
}

/// Parameters of `Input.dispatchKeyEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEventParams {
    /// Event kind.
    #[serde(rename = "type")]
    pub event_type: KeyEventType,
    /// Modifier bit field (Alt=1, Ctrl=2, Meta=4, Shift=8).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub modifiers: u8,
    /// DOM `key` value.
    pub key: String,
    /// DOM `code` value.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    /// Text generated by the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Text the key would generate without modifiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmodified_text: Option<String>,
    /// Windows virtual key code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_virtual_key_code: Option<u32>,
    /// Native virtual key code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_virtual_key_code: Option<u32>,
}

fn is_zero(value: &u8) -> bool {
    *value == 0
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page domain commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Enable page events.
    #[serde(rename = "Page.enable")]
    Enable,

    /// Bring the page to front (activate tab).
    #[serde(rename = "Page.bringToFront")]
    BringToFront,

    /// Navigate the page.
    #[serde(rename = "Page.navigate")]
    Navigate {
        /// URL to navigate to.
        url: String,
    },

    /// Reload the page.
    #[serde(rename = "Page.reload")]
    Reload {
        /// Bypass the cache.
        #[serde(rename = "ignoreCache")]
        ignore_cache: bool,
    },
}

impl PageCommand {
    /// Returns the method name.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Enable => "Page.enable",
            Self::BringToFront => "Page.bringToFront",
            Self::Navigate { .. } => "Page.navigate",
            Self::Reload { .. } => "Page.reload",
        }
    }
}

// ============================================================================
// Profiler Commands
// ============================================================================

/// Profiler domain commands for V8 precise coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ProfilerCommand {
    /// Enable the profiler.
    #[serde(rename = "Profiler.enable")]
    Enable,

    /// Disable the profiler.
    #[serde(rename = "Profiler.disable")]
    Disable,

    /// Start collecting precise coverage.
    #[serde(rename = "Profiler.startPreciseCoverage")]
    StartPreciseCoverage {
        /// Collect execution counts instead of booleans.
        #[serde(rename = "callCount")]
        call_count: bool,
        /// Collect block-level coverage.
        detailed: bool,
    },

    /// Collect coverage since the previous take; resets counters.
    #[serde(rename = "Profiler.takePreciseCoverage")]
    TakePreciseCoverage,

    /// Stop collecting precise coverage.
    #[serde(rename = "Profiler.stopPreciseCoverage")]
    StopPreciseCoverage,
}

impl ProfilerCommand {
    /// Returns the method name.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Enable => "Profiler.enable",
            Self::Disable => "Profiler.disable",
            Self::StartPreciseCoverage { .. } => "Profiler.startPreciseCoverage",
            Self::TakePreciseCoverage => "Profiler.takePreciseCoverage",
            Self::StopPreciseCoverage => "Profiler.stopPreciseCoverage",
        }
    }
}

// ============================================================================
// Log Commands
// ============================================================================

/// Log domain commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum LogCommand {
    /// Enable `Log.entryAdded` events.
    #[serde(rename = "Log.enable")]
    Enable,
}

impl LogCommand {
    /// Returns the method name.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Enable => "Log.enable",
        }
    }
}

// ============================================================================
// Raw Command
// ============================================================================

/// A command given by method name and free-form params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCommand {
    /// `Domain.method` name.
    pub method: String,
    /// Parameters object.
    pub params: Value,
}

impl RawCommand {
    /// Creates a raw command. `null` params become an empty object.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        let params = if params.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            params
        };
        Self {
            method: method.into(),
            params,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
