//! Console capture and coverage methods.

use std::path::Path;

use crate::browser::console::ConsoleCapture;
use crate::browser::coverage::CoverageCollector;
use crate::error::Result;

use super::TargetSession;

// ============================================================================
// TargetSession - Instrumentation
// ============================================================================

impl TargetSession {
    /// Starts capturing console output, optionally appending to `log_file`.
    pub async fn capture_console(
        &self,
        label: impl Into<String>,
        log_file: Option<&Path>,
    ) -> Result<ConsoleCapture> {
        ConsoleCapture::start(self.connection(), label, log_file).await
    }

    /// Starts precise coverage on this target.
    pub async fn start_coverage(&self, label: impl Into<String>) -> Result<CoverageCollector> {
        CoverageCollector::start(self.connection().clone(), label).await
    }
}

// ============================================================================
// Tests
// ============================================================================
