//! Harness coordinator and session factory.
//!
//! The [`Harness`] joins configuration, target discovery and connections:
//! each lookup resolves a target over HTTP, then attaches a
//! [`TargetSession`] to it.
//!
//! # Example
//!
//! ```no_run
//! use cdp_harness::Harness;
//!
//! # async fn example() -> cdp_harness::Result<()> {
//! let harness = Harness::builder().port(9222).build()?;
//!
//! let page = harness.content_page("fixture.html").await?;
//! page.send_keys(&["t", "ArrowDown", "Enter"]).await?;
//!
//! let background = harness.background().await?;
//! let tabs = background.evaluate("chrome.tabs.query({})").await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::browser::TargetSession;
use crate::browser::coverage::CoverageCollector;
use crate::discovery::{Discovery, Target};
use crate::error::Result;
use crate::transport::Connection;

use super::builder::HarnessBuilder;
use super::options::HarnessOptions;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the harness.
pub(crate) struct HarnessInner {
    /// Validated configuration.
    pub options: HarnessOptions,

    /// Discovery client for the configured endpoint.
    pub discovery: Discovery,
}

// ============================================================================
// Harness
// ============================================================================

/// Entry point of an end-to-end test run.
///
/// The harness is cheap to clone; clones share configuration and the
/// discovery client. Targets are re-queried on every lookup, so a target
/// that appears late is still found.
#[derive(Clone)]
pub struct Harness {
    pub(crate) inner: Arc<HarnessInner>,
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("endpoint", &self.inner.discovery.base_url().as_str())
            .field("extension_id", &self.inner.options.extension_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Harness - Construction
// ============================================================================

impl Harness {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::new()
    }

    /// Creates a harness from already validated options.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if host and port do not form a URL
    /// - [`Error::Http`](crate::Error::Http) if the HTTP client cannot be built
    pub fn new(options: HarnessOptions) -> Result<Self> {
        let mut discovery = Discovery::from_url(&options.endpoint())?
            .with_frontend_marker(options.frontend_marker.clone());
        if let Some(id) = &options.extension_id {
            discovery = discovery.with_extension_id(id.clone());
        }

        info!(endpoint = %discovery.base_url(), "Harness ready");

        Ok(Self {
            inner: Arc::new(HarnessInner { options, discovery }),
        })
    }
}

// ============================================================================
// Harness - Accessors
// ============================================================================

impl Harness {
    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &HarnessOptions {
        &self.inner.options
    }

    /// Returns the discovery client.
    #[inline]
    #[must_use]
    pub fn discovery(&self) -> &Discovery {
        &self.inner.discovery
    }

    /// Returns the coverage report directory, if configured.
    #[inline]
    #[must_use]
    pub fn coverage_dir(&self) -> Option<&Path> {
        self.inner.options.coverage_dir.as_deref()
    }
}

// ============================================================================
// Harness - Sessions
// ============================================================================

impl Harness {
    /// Attaches to the extension's background page or service worker.
    ///
    /// # Errors
    ///
    /// - [`Error::TargetNotFound`](crate::Error::TargetNotFound) if no background target is listed
    /// - Any connection error
    pub async fn background(&self) -> Result<TargetSession> {
        let background = self.inner.discovery.find_extension_background().await?;
        self.attach(&background.target).await
    }

    /// Attaches to the first page whose URL contains `url_substring`.
    ///
    /// # Errors
    ///
    /// - [`Error::TargetNotFound`](crate::Error::TargetNotFound) if no page matches
    /// - Any connection error
    pub async fn content_page(&self, url_substring: &str) -> Result<TargetSession> {
        let target = self.inner.discovery.find_content_page(url_substring).await?;
        self.attach(&target).await
    }

    /// Attaches to the extension's UI frame.
    ///
    /// # Errors
    ///
    /// - [`Error::TargetNotFound`](crate::Error::TargetNotFound) if no frontend frame is listed
    /// - Any connection error
    pub async fn frontend(&self) -> Result<TargetSession> {
        let target = self.inner.discovery.find_frontend_target().await?;
        self.attach(&target).await
    }

    /// Opens a new tab at `url` and attaches to it.
    ///
    /// # Errors
    ///
    /// - [`Error::Http`](crate::Error::Http) if the tab cannot be opened
    /// - Any connection error
    pub async fn open_tab(&self, url: &str) -> Result<TargetSession> {
        let target = self.inner.discovery.open_tab(url).await?;
        self.attach(&target).await
    }

    /// Attaches to a target using the configured timeouts.
    ///
    /// # Errors
    ///
    /// - [`Error::TargetNotFound`](crate::Error::TargetNotFound) if the target has no debugger socket
    /// - [`Error::ConnectionTimeout`](crate::Error::ConnectionTimeout) if the handshake stalls
    /// - Any other connection error
    pub async fn attach(&self, target: &Target) -> Result<TargetSession> {
        let options = &self.inner.options;

        let connection =
            Connection::connect_with_timeout(target.debugger_url()?, options.connect_timeout)
                .await?
                .with_command_timeout(options.command_timeout);

        debug!(id = %target.id, target_type = %target.target_type, "Attached to target");

        Ok(TargetSession::new(
            target.clone(),
            connection,
            options.session_options(),
        ))
    }

    /// Writes a coverage report into the configured directory.
    ///
    /// Returns `None` when no coverage directory is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the report cannot be written.
    pub async fn write_coverage(&self, collector: &CoverageCollector) -> Result<Option<PathBuf>> {
        match self.coverage_dir() {
            Some(dir) => collector.write_report(dir).await.map(Some),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
