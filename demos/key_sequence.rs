//! Key sequence demonstration.
//!
//! Demonstrates:
//! - Finding a content page by URL substring
//! - Sending `t`, `ArrowDown`, `Enter` as trusted key events
//! - Asking the extension's background worker for the active tab
//!
//! Usage:
//!   CDP_PORT=9222 cargo run --example key_sequence
//!   cargo run --example key_sequence -- --page fixture.html --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;

use cdp_harness::{RemoteExpression, Result, ReturnShape};
use common::Args;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ActiveTab {
    id: i64,
    url: String,
    title: String,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Key Sequence ===\n");

    // ========================================================================
    // Setup
    // ========================================================================

    let harness = common::harness()?;
    let version = harness.discovery().version().await?;
    println!("[Setup] Connected to {} ({})\n", version.browser, version.protocol_version);

    // ========================================================================
    // Keys
    // ========================================================================

    println!("[1] Attaching to page containing {:?}...", args.page);
    let page = harness.content_page(&args.page).await?;
    println!("        ✓ {}", page.target().url);

    page.bring_to_front().await?;
    page.wait_for_script("document.readyState === 'complete'").await?;

    println!("[2] Sending t, ArrowDown, Enter...");
    page.send_keys(&["t", "ArrowDown", "Enter"]).await?;
    println!("        ✓ Keys dispatched\n");

    // ========================================================================
    // Background
    // ========================================================================

    println!("[3] Querying active tab from the background worker...");
    let background = harness.background().await?;

    let query = RemoteExpression::function(
        "const [tab] = await chrome.tabs.query({ active: true, lastFocusedWindow: true });\n\
         return tab ? { id: tab.id, url: tab.url, title: tab.title } : null;",
    )
    .returning(ReturnShape::Object);

    let value = background.wait_for_script(query).await?;
    let tab: ActiveTab = serde_json::from_value(value)?;
    println!("        ✓ Active tab #{}: {} ({})", tab.id, tab.title, tab.url);

    page.close().await;
    background.close().await;

    println!("\n=== Done ===");
    Ok(())
}
