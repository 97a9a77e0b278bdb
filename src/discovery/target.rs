//! Target descriptors returned by the discovery endpoint.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{ExtensionId, TargetId};

// ============================================================================
// Constants
// ============================================================================

/// URL scheme of extension resources.
pub const EXTENSION_SCHEME: &str = "chrome-extension";

// ============================================================================
// TargetType
// ============================================================================

/// Kind of debuggable target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetType {
    /// Top-level page (tab).
    Page,
    /// Manifest V2 background page.
    BackgroundPage,
    /// Manifest V3 service worker.
    ServiceWorker,
    /// Out-of-process iframe.
    Iframe,
    /// Dedicated worker.
    Worker,
    /// Shared worker.
    SharedWorker,
    /// Anything else the browser reports.
    Other(String),
}

impl TargetType {
    /// Returns the wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Page => "page",
            Self::BackgroundPage => "background_page",
            Self::ServiceWorker => "service_worker",
            Self::Iframe => "iframe",
            Self::Worker => "worker",
            Self::SharedWorker => "shared_worker",
            Self::Other(name) => name,
        }
    }

    /// Returns `true` for the two kinds an extension background can take.
    #[inline]
    #[must_use]
    pub fn is_background(&self) -> bool {
        matches!(self, Self::BackgroundPage | Self::ServiceWorker)
    }
}

impl From<String> for TargetType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "page" => Self::Page,
            "background_page" => Self::BackgroundPage,
            "service_worker" => Self::ServiceWorker,
            "iframe" => Self::Iframe,
            "worker" => Self::Worker,
            "shared_worker" => Self::SharedWorker,
            _ => Self::Other(value),
        }
    }
}

impl From<TargetType> for String {
    fn from(value: TargetType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Target
// ============================================================================

/// One entry of the `/json` target listing.
///
/// Targets are snapshots: the listing is re-queried on every lookup and a
/// `Target` is used once to open a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Target ID.
    pub id: TargetId,
    /// Target kind.
    #[serde(rename = "type")]
    pub target_type: TargetType,
    /// Title (document title or worker name).
    #[serde(default)]
    pub title: String,
    /// Current URL.
    #[serde(default)]
    pub url: String,
    /// Debugger socket. Absent when another client is attached.
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
    /// DevTools frontend link.
    #[serde(default)]
    pub devtools_frontend_url: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl Target {
    /// Returns the extension id when the URL uses the extension scheme.
    #[must_use]
    pub fn extension_id(&self) -> Option<ExtensionId> {
        let url = Url::parse(&self.url).ok()?;
        if url.scheme() != EXTENSION_SCHEME {
            return None;
        }
        url.host_str().map(ExtensionId::new)
    }

    /// Returns `true` when the URL uses the extension scheme.
    #[inline]
    #[must_use]
    pub fn is_extension(&self) -> bool {
        self.extension_id().is_some()
    }

    /// Returns the debugger socket URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetNotFound`] when the listing carries no socket,
    /// which happens while another client is attached to the target.
    pub fn debugger_url(&self) -> Result<&str> {
        self.web_socket_debugger_url.as_deref().ok_or_else(|| {
            Error::target_not_found(format!(
                "{} target {} ({}) has no webSocketDebuggerUrl; another client is attached",
                self.target_type, self.id, self.url
            ))
        })
    }
}

// ============================================================================
// BrowserVersion
// ============================================================================

/// Payload of `/json/version`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BrowserVersion {
    /// Product name and version.
    #[serde(rename = "Browser")]
    pub browser: String,
    /// CDP version.
    #[serde(rename = "Protocol-Version")]
    pub protocol_version: String,
    /// Browser user agent.
    #[serde(rename = "User-Agent", default)]
    pub user_agent: String,
    /// V8 version.
    #[serde(rename = "V8-Version", default)]
    pub v8_version: Option<String>,
    /// Browser-level debugger socket.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: Option<String>,
}

// ============================================================================
// ExtensionBackground
// ============================================================================

/// The extension background target and the id parsed from its URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionBackground {
    /// Extension id (host of the background URL).
    pub extension_id: ExtensionId,
    /// Background target.
    pub target: Target,
}

// ============================================================================
// Tests
// ============================================================================
