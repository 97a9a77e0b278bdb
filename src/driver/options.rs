//! Validated harness configuration.
//!
//! [`HarnessOptions`] holds every knob of a [`Harness`](super::Harness):
//!
//! | Field | Default | Environment |
//! |-------|---------|-------------|
//! | `host` | `127.0.0.1` | `CDP_HOST` |
//! | `port` | `9222` | `CDP_PORT` |
//! | `extension_id` | none | `CDP_EXTENSION_ID` |
//! | `frontend_marker` | `frontend.html` | |
//! | `connect_timeout` | 10 s | |
//! | `command_timeout` | 30 s | |
//! | `wait` | 5 s / 50 ms | |
//! | `key_delay` | none | |
//! | `script_timeout` | none | |
//! | `coverage_dir` | none | `CDP_COVERAGE_DIR` |

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::browser::SessionOptions;
use crate::browser::wait::WaitOptions;
use crate::discovery::DEFAULT_FRONTEND_MARKER;
use crate::identifiers::ExtensionId;
use crate::transport::connection::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT};

// ============================================================================
// Constants
// ============================================================================

/// Default remote debugging host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default remote debugging port.
pub const DEFAULT_PORT: u16 = 9222;

// ============================================================================
// HarnessOptions
// ============================================================================

/// Harness configuration.
///
/// Build it with [`HarnessBuilder`](super::HarnessBuilder), which validates
/// the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessOptions {
    /// Remote debugging host.
    pub host: String,

    /// Remote debugging port.
    pub port: u16,

    /// Extension whose targets are looked up, any extension when `None`.
    pub extension_id: Option<ExtensionId>,

    /// URL fragment identifying the extension's UI frame.
    pub frontend_marker: String,

    /// Timeout of the WebSocket handshake.
    pub connect_timeout: Duration,

    /// Default timeout of one command.
    pub command_timeout: Duration,

    /// Default timeout and interval of waits.
    pub wait: WaitOptions,

    /// Delay between key events.
    pub key_delay: Option<Duration>,

    /// Timeout of one script evaluation.
    pub script_timeout: Option<Duration>,

    /// Directory receiving coverage reports.
    pub coverage_dir: Option<PathBuf>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            extension_id: None,
            frontend_marker: DEFAULT_FRONTEND_MARKER.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            wait: WaitOptions::default(),
            key_delay: None,
            script_timeout: None,
            coverage_dir: None,
        }
    }
}

impl HarnessOptions {
    /// Returns the defaults handed to each attached session.
    #[inline]
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            wait: self.wait,
            key_delay: self.key_delay,
            script_timeout: self.script_timeout,
        }
    }

    /// Returns the discovery endpoint, `http://{host}:{port}/`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = HarnessOptions::default();
        assert_eq!(options.host, "127.0.0.1");
        assert_eq!(options.port, 9222);
        assert_eq!(options.frontend_marker, "frontend.html");
        assert_eq!(options.connect_timeout, Duration::from_secs(10));
        assert_eq!(options.command_timeout, Duration::from_secs(30));
        assert_eq!(options.endpoint(), "http://127.0.0.1:9222/");
    }

    #[test]
    fn test_session_options_carry_defaults() {
        let options = HarnessOptions {
            key_delay: Some(Duration::from_millis(20)),
            script_timeout: Some(Duration::from_secs(3)),
            ..HarnessOptions::default()
        };

        let session = options.session_options();
        assert_eq!(session.wait, WaitOptions::default());
        assert_eq!(session.key_delay, Some(Duration::from_millis(20)));
        assert_eq!(session.script_timeout, Some(Duration::from_secs(3)));
    }
}
