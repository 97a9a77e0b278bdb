//! Console logger demonstration.
//!
//! Demonstrates:
//! - Listing every page and extension worker target
//! - Capturing console output of each into one log file per target
//! - Printing errors as they accumulate until Ctrl+C
//!
//! Usage:
//!   CDP_PORT=9222 cargo run --example console_logger
//!   cargo run --example console_logger -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use tracing::warn;

use cdp_harness::browser::console::log_path;
use cdp_harness::{ConsoleCapture, Result, Target, TargetType};
use common::Args;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

fn label_for(target: &Target) -> String {
    match target.extension_id() {
        Some(_) => format!("extension-{}-{}", target.target_type, target.id),
        None => format!("{}-{}", target.target_type, target.id),
    }
}

async fn run() -> Result<()> {
    println!("=== Console Logger ===\n");

    let harness = common::harness()?;
    let log_dir = PathBuf::from("console-logs");

    // ========================================================================
    // Attach
    // ========================================================================

    let targets = harness.discovery().list_targets().await?;
    let mut captures: Vec<(ConsoleCapture, cdp_harness::TargetSession)> = Vec::new();

    for target in targets.iter().filter(|t| {
        matches!(
            t.target_type,
            TargetType::Page | TargetType::BackgroundPage | TargetType::ServiceWorker
        )
    }) {
        let label = label_for(target);
        let session = match harness.attach(target).await {
            Ok(session) => session,
            Err(e) => {
                warn!(%label, error = %e, "Skipping target");
                continue;
            }
        };

        let path = log_path(&log_dir, &label);
        let capture = session.capture_console(label.clone(), Some(path.as_path())).await?;
        println!("[+] {label} -> {}", path.display());
        captures.push((capture, session));
    }

    if captures.is_empty() {
        println!("No page or extension targets to capture.");
        return Ok(());
    }

    // ========================================================================
    // Wait
    // ========================================================================

    println!("\nCapturing {} target(s). Press Ctrl+C to stop...", captures.len());
    tokio::signal::ctrl_c().await?;

    for (capture, session) in captures {
        let label = capture.label().to_string();
        let entries = capture.stop();
        let errors = entries.iter().filter(|e| e.is_error()).count();
        println!("[{label}] {} entries, {errors} error(s)", entries.len());
        for entry in entries.iter().filter(|e| e.is_error()) {
            println!("        {entry}");
        }
        session.close().await;
    }

    Ok(())
}
