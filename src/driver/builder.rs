//! Builder pattern for harness configuration.
//!
//! Provides a fluent API for configuring and creating [`Harness`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use cdp_harness::Harness;
//!
//! # fn example() -> cdp_harness::Result<()> {
//! let harness = Harness::builder()
//!     .port(9222)
//!     .extension_id("abcdefghijklmnopabcdefghijklmnop")
//!     .key_delay(Duration::from_millis(20))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::browser::wait::WaitOptions;
use crate::error::{Error, Result};
use crate::identifiers::ExtensionId;

use super::core::Harness;
use super::options::HarnessOptions;

// ============================================================================
// Environment
// ============================================================================

/// Variable overriding the remote debugging host.
pub const ENV_HOST: &str = "CDP_HOST";

/// Variable overriding the remote debugging port.
pub const ENV_PORT: &str = "CDP_PORT";

/// Variable naming the expected extension id.
pub const ENV_EXTENSION_ID: &str = "CDP_EXTENSION_ID";

/// Variable naming the coverage report directory.
pub const ENV_COVERAGE_DIR: &str = "CDP_COVERAGE_DIR";

// ============================================================================
// HarnessBuilder
// ============================================================================

/// Builder for configuring a [`Harness`] instance.
///
/// Use [`Harness::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct HarnessBuilder {
    options: HarnessOptions,
}

// ============================================================================
// HarnessBuilder Implementation
// ============================================================================

impl HarnessBuilder {
    /// Creates a builder holding the default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder seeded from `CDP_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `CDP_PORT` is not a port number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates a builder seeded from an arbitrary variable lookup.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::new();

        if let Some(host) = lookup(ENV_HOST).filter(|v| !v.is_empty()) {
            builder = builder.host(host);
        }
        if let Some(port) = lookup(ENV_PORT).filter(|v| !v.is_empty()) {
            let port = port.trim().parse::<u16>().map_err(|e| {
                Error::config(format!("{ENV_PORT} must be a port number, got {port:?}: {e}"))
            })?;
            builder = builder.port(port);
        }
        if let Some(id) = lookup(ENV_EXTENSION_ID).filter(|v| !v.is_empty()) {
            builder = builder.extension_id(id);
        }
        if let Some(dir) = lookup(ENV_COVERAGE_DIR).filter(|v| !v.is_empty()) {
            builder = builder.coverage_dir(dir);
        }

        Ok(builder)
    }

    /// Sets the remote debugging host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.options.host = host.into();
        self
    }

    /// Sets the remote debugging port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }

    /// Restricts extension lookups to one extension.
    #[inline]
    #[must_use]
    pub fn extension_id(mut self, id: impl Into<String>) -> Self {
        self.options.extension_id = Some(ExtensionId::new(id));
        self
    }

    /// Sets the URL fragment identifying the extension's UI frame.
    #[inline]
    #[must_use]
    pub fn frontend_marker(mut self, marker: impl Into<String>) -> Self {
        self.options.frontend_marker = marker.into();
        self
    }

    /// Sets the WebSocket handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Sets the default command timeout.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.options.command_timeout = timeout;
        self
    }

    /// Sets the default wait timeout and polling interval.
    #[inline]
    #[must_use]
    pub fn wait(mut self, wait: WaitOptions) -> Self {
        self.options.wait = wait;
        self
    }

    /// Sets the delay between key events.
    #[inline]
    #[must_use]
    pub fn key_delay(mut self, delay: Duration) -> Self {
        self.options.key_delay = Some(delay);
        self
    }

    /// Sets the timeout of one script evaluation.
    #[inline]
    #[must_use]
    pub fn script_timeout(mut self, timeout: Duration) -> Self {
        self.options.script_timeout = Some(timeout);
        self
    }

    /// Sets the directory receiving coverage reports.
    #[inline]
    #[must_use]
    pub fn coverage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.coverage_dir = Some(dir.into());
        self
    }

    /// Builds the harness with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a value is out of range
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub fn build(self) -> Result<Harness> {
        let options = self.validate()?;
        debug!(endpoint = %options.endpoint(), "Building harness");
        Harness::new(options)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl HarnessBuilder {
    /// Validates the collected options.
    fn validate(self) -> Result<HarnessOptions> {
        let options = self.options;

        if options.host.trim().is_empty() {
            return Err(Error::config(
                "Host must not be empty. Use .host() to set it.\n\
                 Example: Harness::builder().host(\"127.0.0.1\")",
            ));
        }

        if options.port == 0 {
            return Err(Error::config(
                "Port must be non-zero. Use .port() to set it.\n\
                 Example: Harness::builder().port(9222)",
            ));
        }

        if let Some(id) = &options.extension_id {
            let valid = !id.as_str().is_empty()
                && id.as_str().chars().all(|c| c.is_ascii_alphanumeric());
            if !valid {
                return Err(Error::config(format!(
                    "Extension id {id:?} must be a non-empty alphanumeric string"
                )));
            }
        }

        if options.frontend_marker.is_empty() {
            return Err(Error::config("Frontend marker must not be empty"));
        }

        if options.connect_timeout.is_zero() || options.command_timeout.is_zero() {
            return Err(Error::config("Connect and command timeouts must be non-zero"));
        }

        if options.wait.timeout.is_zero() || options.wait.interval.is_zero() {
            return Err(Error::config("Wait timeout and interval must be non-zero"));
        }

        if options.wait.interval > options.wait.timeout {
            return Err(Error::config(format!(
                "Wait interval ({:?}) exceeds wait timeout ({:?})",
                options.wait.interval, options.wait.timeout
            )));
        }

        if let Some(dir) = &options.coverage_dir
            && dir.is_file()
        {
            return Err(Error::config(format!(
                "Coverage directory {} is a file",
                dir.display()
            )));
        }

        Ok(options)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use rustc_hash::FxHashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: FxHashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_new_holds_defaults() {
        let builder = HarnessBuilder::new();
        assert_eq!(builder.options, HarnessOptions::default());
    }

    #[test]
    fn test_setters() {
        let builder = HarnessBuilder::new()
            .host("localhost")
            .port(9333)
            .extension_id("abcdef")
            .frontend_marker("panel.html")
            .key_delay(Duration::from_millis(15))
            .coverage_dir("/tmp/coverage");

        assert_eq!(builder.options.host, "localhost");
        assert_eq!(builder.options.port, 9333);
        assert_eq!(builder.options.extension_id, Some(ExtensionId::new("abcdef")));
        assert_eq!(builder.options.frontend_marker, "panel.html");
        assert_eq!(builder.options.key_delay, Some(Duration::from_millis(15)));
        assert_eq!(builder.options.coverage_dir, Some(PathBuf::from("/tmp/coverage")));
    }

    #[test]
    fn test_from_lookup_reads_variables() {
        let builder = HarnessBuilder::from_lookup(lookup(&[
            ("CDP_HOST", "10.0.0.5"),
            ("CDP_PORT", "9333"),
            ("CDP_EXTENSION_ID", "abcdefghijklmnop"),
            ("CDP_COVERAGE_DIR", "out/coverage"),
        ]))
        .expect("lookup");

        assert_eq!(builder.options.host, "10.0.0.5");
        assert_eq!(builder.options.port, 9333);
        assert_eq!(
            builder.options.extension_id,
            Some(ExtensionId::new("abcdefghijklmnop"))
        );
        assert_eq!(builder.options.coverage_dir, Some(PathBuf::from("out/coverage")));
    }

    #[test]
    fn test_from_lookup_keeps_defaults_when_unset() {
        let builder = HarnessBuilder::from_lookup(lookup(&[("CDP_HOST", "")])).expect("lookup");
        assert_eq!(builder.options, HarnessOptions::default());
    }

    #[test]
    fn test_from_lookup_rejects_bad_port() {
        let err = HarnessBuilder::from_lookup(lookup(&[("CDP_PORT", "ninety")]))
            .expect_err("should fail");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(HarnessBuilder::new().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let err = HarnessBuilder::new().port(0).validate().expect_err("should fail");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let err = HarnessBuilder::new().host("  ").validate().expect_err("should fail");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_extension_id() {
        let err = HarnessBuilder::new()
            .extension_id("chrome-extension://abc")
            .validate()
            .expect_err("should fail");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_interval_above_timeout() {
        let err = HarnessBuilder::new()
            .wait(WaitOptions::new(Duration::from_millis(10), Duration::from_secs(1)))
            .validate()
            .expect_err("should fail");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let err = HarnessBuilder::new()
            .command_timeout(Duration::ZERO)
            .validate()
            .expect_err("should fail");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_file_as_coverage_dir() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        let err = HarnessBuilder::new()
            .coverage_dir(file.path())
            .validate()
            .expect_err("should fail");
        assert!(matches!(err, Error::Config { .. }));
    }
}
