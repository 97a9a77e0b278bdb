//! Type-safe identifiers.
//!
//! Newtype wrappers keep request ids, subscription ids, target ids and
//! extension ids from being mixed up at compile time.
//!
//! | Type | Scope |
//! |------|-------|
//! | [`RequestId`] | Per connection, monotonic from 1 |
//! | [`SubscriptionId`] | Per connection, monotonic from 1 |
//! | [`TargetId`] | Browser-assigned target identifier |
//! | [`ExtensionId`] | Host part of a `chrome-extension://` URL |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// RequestId
// ============================================================================

/// Identifier of a command sent over one connection.
///
/// Ids are allocated per connection, never globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Creates a request id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SubscriptionId
// ============================================================================

/// Identifier of a one-shot event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a subscription id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// TargetId
// ============================================================================

/// Browser-assigned target identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    /// Creates a target id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ExtensionId
// ============================================================================

/// Extension identifier, the host of its `chrome-extension://` URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionId(String);

impl ExtensionId {
    /// Creates an extension id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the URL of a resource inside the extension.
    ///
    /// # Example
    ///
    /// ```
    /// use cdp_harness::ExtensionId;
    ///
    /// let id = ExtensionId::new("abcdefghijklmnop");
    /// assert_eq!(
    ///     id.resource_url("pages/options.html"),
    ///     "chrome-extension://abcdefghijklmnop/pages/options.html"
    /// );
    /// ```
    #[must_use]
    pub fn resource_url(&self, path: &str) -> String {
        format!(
            "chrome-extension://{}/{}",
            self.0,
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_serializes_as_number() {
        let json = serde_json::to_string(&RequestId::new(7)).expect("serialize");
        assert_eq!(json, "7");
    }

    #[test]
    fn test_request_id_ordering() {
        assert!(RequestId::new(1) < RequestId::new(2));
    }

    #[test]
    fn test_extension_resource_url_strips_leading_slash() {
        let id = ExtensionId::new("ext");
        assert_eq!(id.resource_url("/a.html"), "chrome-extension://ext/a.html");
    }
}
