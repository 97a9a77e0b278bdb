//! Target discovery over the remote debugging HTTP endpoint.
//!
//! The browser publishes its debuggable targets as JSON:
//!
//! | Endpoint | Method | Purpose |
//! |----------|--------|---------|
//! | `/json` | GET | List targets |
//! | `/json/version` | GET | Browser and protocol version |
//! | `/json/new?<url>` | PUT | Open a tab |
//! | `/json/activate/<id>` | GET | Focus a target |
//! | `/json/close/<id>` | GET | Close a target |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | [`Discovery`] HTTP client and lookups |
//! | `target` | [`Target`] descriptors |

// ============================================================================
// Submodules
// ============================================================================

/// HTTP client and lookups.
pub mod client;

/// Target descriptors.
pub mod target;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{DEFAULT_FRONTEND_MARKER, Discovery};
pub use target::{BrowserVersion, EXTENSION_SCHEME, ExtensionBackground, Target, TargetType};
