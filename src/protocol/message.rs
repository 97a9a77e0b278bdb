//! Inbound frame classification.
//!
//! Every text frame received from a target is exactly one of:
//!
//! | Variant | Shape |
//! |---------|-------|
//! | [`Inbound::Response`] | `{"id": n, "result" \| "error": ...}` |
//! | [`Inbound::Event`] | `{"method": "...", "params": {...}}` |
//! | [`Inbound::Malformed`] | numeric `id` but no valid response body |
//!
//! Anything else is a protocol error.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::{Event, Response};

// ============================================================================
// Inbound
// ============================================================================

/// A classified inbound protocol message.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Reply to a command.
    Response(Response),
    /// Unsolicited notification.
    Event(Event),
    /// Reply whose body could not be read; the request it answers still fails.
    Malformed {
        /// Id of the answered request.
        id: RequestId,
        /// Why the body was rejected.
        reason: String,
    },
}

impl Inbound {
    /// Parses and classifies one text frame.
    ///
    /// A frame carrying an `id` is a response even if it also has a
    /// `method` field.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the frame is not valid JSON
    /// - [`Error::Protocol`] if it is neither a response nor an event
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;

        if value.get("id").is_some() {
            let id = value.get("id").and_then(Value::as_u64);
            return match (serde_json::from_value(value), id) {
                (Ok(response), _) => Ok(Self::Response(response)),
                (Err(e), Some(id)) => Ok(Self::Malformed {
                    id: RequestId::new(id),
                    reason: e.to_string(),
                }),
                (Err(e), None) => Err(e.into()),
            };
        }

        if value.get("method").and_then(Value::as_str).is_some() {
            return Ok(Self::Event(serde_json::from_value(value)?));
        }

        Err(Error::protocol(format!(
            "frame is neither response nor event: {text}"
        )))
    }
}

// ============================================================================
// Tests
// ============================================================================
