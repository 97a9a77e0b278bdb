//! Sessions attached to one discovered target.
//!
//! A [`TargetSession`] pairs a [`Target`](crate::discovery::Target) with
//! its open [`Connection`](crate::transport::Connection) and the wait and
//! input defaults of the harness.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Session struct, options and accessors |
//! | `script` | Remote evaluation and script polling |
//! | `input` | Keys and text |
//! | `page` | Focus, navigation, reload |
//! | `instrument` | Console capture and coverage |
//!
//! # Example
//!
//! ```ignore
//! let page = harness.content_page("fixture.html").await?;
//!
//! page.bring_to_front().await?;
//! page.send_key("f").await?;
//! page.wait_for_script("document.querySelectorAll('.hint').length > 0").await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod input;
mod instrument;
mod page;
mod script;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{SessionOptions, TargetSession};
