//! Harness entry point and configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Harness`] | Discovery plus attach, producing target sessions |
//! | [`HarnessBuilder`] | Fluent configuration builder, also reads `CDP_*` variables |
//! | [`HarnessOptions`] | Validated configuration |
//!
//! # Example
//!
//! ```no_run
//! use cdp_harness::{Harness, Result};
//!
//! # async fn example() -> Result<()> {
//! let harness = Harness::builder().port(9222).build()?;
//!
//! let frontend = harness.frontend().await?;
//! frontend.wait_for_script("document.querySelector('#ready')").await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for harness configuration.
pub mod builder;

/// Core harness implementation.
pub mod core;

/// Harness options and defaults.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::HarnessBuilder;
pub use core::Harness;
pub use options::HarnessOptions;
