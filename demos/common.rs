//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Harness construction from `CDP_*` variables

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use cdp_harness::{Harness, HarnessBuilder, Result};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub page: String,
}

impl Args {
    /// Parse command-line arguments.
    ///
    /// `--page <substring>` selects the content page, `fixture.html` by default.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let page = args
            .iter()
            .position(|a| a == "--page")
            .and_then(|i| args.get(i + 1))
            .cloned()
            .unwrap_or_else(|| "fixture.html".to_string());

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            page,
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "cdp_harness=debug"
    } else {
        "cdp_harness=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();
}

/// Build a harness from `CDP_HOST`, `CDP_PORT` and `CDP_EXTENSION_ID`.
pub fn harness() -> Result<Harness> {
    HarnessBuilder::from_env()?.build()
}
