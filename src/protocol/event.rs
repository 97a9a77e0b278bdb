//! Event message types.
//!
//! Events are unsolicited notifications a target pushes over its socket.
//!
//! # Event Types
//!
//! | Domain | Events |
//! |--------|--------|
//! | `Page` | `frameNavigated`, `loadEventFired`, `domContentEventFired` |
//! | `Runtime` | `consoleAPICalled`, `exceptionThrown`, `executionContextCreated` |
//! | `Log` | `entryAdded` |
//! | `Inspector` | `detached` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Event
// ============================================================================

/// An event notification from a target.
///
/// # Format
///
/// ```json
/// {
///   "method": "Domain.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Creates an event.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Returns the domain name from the method.
    ///
    /// # Example
    ///
    /// ```
    /// use cdp_harness::protocol::Event;
    ///
    /// let event = Event::new("Page.loadEventFired", serde_json::json!({}));
    /// assert_eq!(event.domain(), "Page");
    /// assert_eq!(event.event_name(), "loadEventFired");
    /// ```
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Returns `true` if the event has the given method.
    #[inline]
    #[must_use]
    pub fn is(&self, method: &str) -> bool {
        self.method == method
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        self.parse_internal()
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// A frame committed a navigation.
    PageFrameNavigated {
        /// Frame ID.
        frame_id: String,
        /// Parent frame ID (None for the main frame).
        parent_id: Option<String>,
        /// Frame URL.
        url: String,
    },

    /// Page `load` event fired.
    PageLoadEventFired {
        /// Monotonic timestamp in seconds.
        timestamp: f64,
    },

    /// Page `DOMContentLoaded` event fired.
    PageDomContentEventFired {
        /// Monotonic timestamp in seconds.
        timestamp: f64,
    },

    /// A `console.*` API was called.
    RuntimeConsoleApiCalled {
        /// Call type (`log`, `error`, `warning`, ...).
        kind: String,
        /// Arguments rendered as text.
        args: Vec<String>,
        /// Wall-clock timestamp in milliseconds.
        timestamp: f64,
    },

    /// An uncaught exception was thrown.
    RuntimeExceptionThrown {
        /// Exception summary text.
        text: String,
        /// Exception description (usually message with stack).
        description: Option<String>,
        /// Wall-clock timestamp in milliseconds.
        timestamp: f64,
    },

    /// A JavaScript execution context was created.
    RuntimeExecutionContextCreated {
        /// Context ID.
        id: i64,
        /// Context origin.
        origin: String,
        /// Human readable name.
        name: String,
    },

    /// Browser log entry.
    LogEntryAdded {
        /// Entry source (`javascript`, `network`, ...).
        source: String,
        /// Log level (`verbose`, `info`, `warning`, `error`).
        level: String,
        /// Entry text.
        text: String,
        /// Wall-clock timestamp in milliseconds.
        timestamp: f64,
    },

    /// The debugger was detached from the target.
    InspectorDetached {
        /// Detach reason.
        reason: String,
    },

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Event Parsing Implementation
// ============================================================================

impl Event {
    /// Internal parsing implementation.
    fn parse_internal(&self) -> ParsedEvent {
        match self.method.as_str() {
            "Page.frameNavigated" => {
                let frame = self.params.get("frame").unwrap_or(&Value::Null);
                ParsedEvent::PageFrameNavigated {
                    frame_id: get_string(frame, "id"),
                    parent_id: get_optional_string(frame, "parentId"),
                    url: get_string(frame, "url"),
                }
            }

            "Page.loadEventFired" => ParsedEvent::PageLoadEventFired {
                timestamp: get_f64(&self.params, "timestamp"),
            },

            "Page.domContentEventFired" => ParsedEvent::PageDomContentEventFired {
                timestamp: get_f64(&self.params, "timestamp"),
            },

            "Runtime.consoleAPICalled" => ParsedEvent::RuntimeConsoleApiCalled {
                kind: get_string(&self.params, "type"),
                args: self
                    .params
                    .get("args")
                    .and_then(Value::as_array)
                    .map(|args| args.iter().map(remote_object_text).collect())
                    .unwrap_or_default(),
                timestamp: get_f64(&self.params, "timestamp"),
            },

            "Runtime.exceptionThrown" => {
                let details = self
                    .params
                    .get("exceptionDetails")
                    .unwrap_or(&Value::Null);
                ParsedEvent::RuntimeExceptionThrown {
                    text: get_string(details, "text"),
                    description: details
                        .get("exception")
                        .and_then(|exception| get_optional_string(exception, "description")),
                    timestamp: get_f64(&self.params, "timestamp"),
                }
            }

            "Runtime.executionContextCreated" => {
                let context = self.params.get("context").unwrap_or(&Value::Null);
                ParsedEvent::RuntimeExecutionContextCreated {
                    id: context.get("id").and_then(Value::as_i64).unwrap_or_default(),
                    origin: get_string(context, "origin"),
                    name: get_string(context, "name"),
                }
            }

            "Log.entryAdded" => {
                let entry = self.params.get("entry").unwrap_or(&Value::Null);
                ParsedEvent::LogEntryAdded {
                    source: get_string(entry, "source"),
                    level: get_string(entry, "level"),
                    text: get_string(entry, "text"),
                    timestamp: get_f64(entry, "timestamp"),
                }
            }

            "Inspector.detached" => ParsedEvent::InspectorDetached {
                reason: get_string(&self.params, "reason"),
            },

            _ => ParsedEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Renders a `Runtime.RemoteObject` as console text.
///
/// Strings print verbatim; other values print their JSON value, falling
/// back to the object description.
#[must_use]
pub fn remote_object_text(object: &Value) -> String {
    match object.get("value") {
        Some(Value::String(text)) => text.clone(),
        Some(value) if !value.is_null() || object.get("type").is_some_and(|t| t == "object") => {
            value.to_string()
        }
        _ => object
            .get("unserializableValue")
            .or_else(|| object.get("description"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| get_string(object, "type")),
    }
}

#[inline]
fn get_string(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[inline]
fn get_optional_string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

#[inline]
fn get_f64(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
