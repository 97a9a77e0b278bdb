//! Keyboard input methods.

use crate::browser::input;
use crate::error::Result;

use super::TargetSession;

// ============================================================================
// TargetSession - Input
// ============================================================================

impl TargetSession {
    /// Presses one key token, such as `"f"`, `"Escape"` or `"Ctrl+Shift+k"`.
    pub async fn send_key(&self, token: &str) -> Result<()> {
        input::send_key(self.connection(), token, self.options().key_delay).await
    }

    /// Presses a sequence of key tokens.
    pub async fn send_keys(&self, tokens: &[&str]) -> Result<()> {
        input::send_keys(self.connection(), tokens, self.options().key_delay).await
    }

    /// Types text one key per character.
    pub async fn type_text(&self, text: &str) -> Result<()> {
        input::type_text(self.connection(), text, self.options().key_delay).await
    }

    /// Inserts text without key events.
    pub async fn insert_text(&self, text: &str) -> Result<()> {
        input::insert_text(self.connection(), text).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::browser::session::core::mock_session;

    #[tokio::test]
    async fn test_send_keys_through_session() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let page = mock_session(move |request| {
            log.lock().push(request.params["key"].clone());
            vec![request.reply(json!({}))]
        })
        .await;

        page.send_keys(&["t", "Escape"]).await.expect("keys");

        assert_eq!(
            *seen.lock(),
            vec![json!("t"), json!("t"), json!("Escape"), json!("Escape")]
        );
    }
}
