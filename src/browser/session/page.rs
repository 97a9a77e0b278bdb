//! Page focus and navigation methods.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Command, PageCommand};

use super::TargetSession;

// ============================================================================
// TargetSession - Page
// ============================================================================

impl TargetSession {
    /// Activates the page so it receives keyboard input.
    pub async fn bring_to_front(&self) -> Result<()> {
        self.connection()
            .execute(Command::Page(PageCommand::BringToFront))
            .await?;
        Ok(())
    }

    /// Navigates to `url` and waits for its `load` event.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the browser reports a navigation error
    /// - [`Error::WaitTimeout`] if the page does not finish loading in time
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.connection()
            .execute(Command::Page(PageCommand::Enable))
            .await?;

        let loaded = self.connection().on_method("Page.loadEventFired");
        let result = self
            .connection()
            .execute(Command::Page(PageCommand::Navigate {
                url: url.to_string(),
            }))
            .await?;

        if let Some(error) = result
            .get("errorText")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
        {
            return Err(Error::protocol(format!("Navigation to {url} failed: {error}")));
        }

        loaded.recv_timeout(self.options().wait.timeout).await?;
        debug!(url, "Navigation complete");
        Ok(())
    }

    /// Reloads the page and waits for its `load` event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaitTimeout`] if the page does not finish loading in time.
    pub async fn reload(&self, ignore_cache: bool) -> Result<()> {
        self.connection()
            .execute(Command::Page(PageCommand::Enable))
            .await?;

        let loaded = self.connection().on_method("Page.loadEventFired");
        self.connection()
            .execute(Command::Page(PageCommand::Reload { ignore_cache }))
            .await?;

        loaded.recv_timeout(self.options().wait.timeout).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
