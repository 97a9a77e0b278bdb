//! Protocol-level keyboard input.
//!
//! Keys are dispatched with `Input.dispatchKeyEvent`, so the target sees
//! trusted `keydown`/`keyup` events exactly as if typed.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::{Command, InputCommand};
use crate::transport::Connection;

use super::keyboard::{Key, KeyStroke, Modifiers};

// ============================================================================
// Dispatch
// ============================================================================

/// Presses and releases one key given as a token.
///
/// The token is parsed before anything is sent; `delay` is slept between
/// `keyDown` and `keyUp`.
///
/// # Errors
///
/// - [`Error::UnknownKey`] for unparseable tokens
/// - Any connection error from sending the key events
pub async fn send_key(connection: &Connection, token: &str, delay: Option<Duration>) -> Result<()> {
    let stroke = KeyStroke::parse(token)?;
    dispatch_stroke(connection, &stroke, delay).await
}

/// Presses and releases a resolved key stroke.
///
/// # Errors
///
/// Returns any connection error from sending the key events.
pub async fn dispatch_stroke(
    connection: &Connection,
    stroke: &KeyStroke,
    delay: Option<Duration>,
) -> Result<()> {
    trace!(%stroke, "Dispatching key");

    let [down, up] = stroke.key_events();
    connection
        .execute(Command::Input(InputCommand::DispatchKeyEvent(down)))
        .await?;

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    connection
        .execute(Command::Input(InputCommand::DispatchKeyEvent(up)))
        .await?;

    Ok(())
}

/// Sends a sequence of key tokens, sleeping `delay` after each key.
///
/// Every token is parsed first, so an unknown token sends nothing.
///
/// # Errors
///
/// Same as [`send_key`].
pub async fn send_keys(
    connection: &Connection,
    tokens: &[&str],
    delay: Option<Duration>,
) -> Result<()> {
    let strokes = tokens
        .iter()
        .map(|token| KeyStroke::parse(token))
        .collect::<Result<Vec<_>>>()?;

    debug!(count = strokes.len(), "Sending key sequence");

    for stroke in &strokes {
        dispatch_stroke(connection, stroke, delay).await?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    Ok(())
}

/// Types text one key per character.
///
/// Newlines press Enter and tabs press Tab.
///
/// # Errors
///
/// - [`Error::UnknownKey`] for other control characters
/// - Any connection error from sending the key events
pub async fn type_text(connection: &Connection, text: &str, delay: Option<Duration>) -> Result<()> {
    let strokes = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' => Ok(KeyStroke::from_key(Key::Enter, Modifiers::NONE)),
            '\t' => Ok(KeyStroke::from_key(Key::Tab, Modifiers::NONE)),
            _ => KeyStroke::from_char(c, Modifiers::NONE)
                .ok_or_else(|| Error::unknown_key(c.escape_default().to_string())),
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(chars = strokes.len(), "Typing text");

    for stroke in &strokes {
        dispatch_stroke(connection, stroke, delay).await?;
    }

    Ok(())
}

/// Inserts text in one step, bypassing key events.
///
/// # Errors
///
/// Returns any connection error.
pub async fn insert_text(connection: &Connection, text: &str) -> Result<()> {
    connection
        .execute(Command::Input(InputCommand::InsertText {
            text: text.to_string(),
        }))
        .await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use crate::transport::{MockRequest, MockTarget};

    async fn recording_target() -> (Connection, Arc<Mutex<Vec<MockRequest>>>) {
        let target = MockTarget::bind().await.expect("bind");
        let url = target.ws_url();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let _server = target.serve(move |request| {
            log.lock().push(request.clone());
            vec![request.reply(json!({}))]
        });
        let connection = Connection::connect(&url).await.expect("connect");
        (connection, seen)
    }

    fn key_params(seen: &[MockRequest]) -> Vec<Value> {
        seen.iter()
            .filter(|r| r.method == "Input.dispatchKeyEvent")
            .map(|r| r.params.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_send_key_dispatches_down_then_up() {
        let (connection, seen) = recording_target().await;

        send_key(&connection, "Ctrl+Shift+k", Some(Duration::from_millis(5)))
            .await
            .expect("send");

        let params = key_params(&seen.lock());
        assert_eq!(params.len(), 2);
        assert_eq!(params[0]["type"], "keyDown");
        assert_eq!(params[0]["modifiers"], 10);
        assert_eq!(params[0]["key"], "K");
        assert_eq!(params[0]["code"], "KeyK");
        assert!(params[0].get("text").is_none());
        assert_eq!(params[1]["type"], "keyUp");
    }

    #[tokio::test]
    async fn test_unknown_key_sends_nothing() {
        let (connection, seen) = recording_target().await;

        let err = send_key(&connection, "Hyperspace", None)
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::UnknownKey { .. }));

        let err = send_keys(&connection, &["t", "Bogus"], None)
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::UnknownKey { .. }));

        connection.send("Test.marker", json!({})).await.expect("marker");
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "Test.marker");
    }

    #[tokio::test]
    async fn test_send_keys_in_order() {
        let (connection, seen) = recording_target().await;

        send_keys(&connection, &["t", "ArrowDown", "Enter"], None)
            .await
            .expect("send");

        let keys: Vec<Value> = key_params(&seen.lock())
            .into_iter()
            .filter(|p| p["type"] == "keyDown")
            .map(|p| p["key"].clone())
            .collect();
        assert_eq!(keys, vec![json!("t"), json!("ArrowDown"), json!("Enter")]);
    }

    #[tokio::test]
    async fn test_type_text_handles_newline() {
        let (connection, seen) = recording_target().await;

        type_text(&connection, "Hi\n", None).await.expect("type");

        let downs: Vec<Value> = key_params(&seen.lock())
            .into_iter()
            .filter(|p| p["type"] == "keyDown")
            .collect();
        assert_eq!(downs.len(), 3);
        assert_eq!(downs[0]["modifiers"], 8);
        assert_eq!(downs[1]["text"], "i");
        assert_eq!(downs[2]["key"], "Enter");
        assert_eq!(downs[2]["text"], "\r");
    }

    #[tokio::test]
    async fn test_insert_text() {
        let (connection, seen) = recording_target().await;

        insert_text(&connection, "hello").await.expect("insert");

        let seen = seen.lock();
        assert_eq!(seen[0].method, "Input.insertText");
        assert_eq!(seen[0].params["text"], "hello");
    }
}
