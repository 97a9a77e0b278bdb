//! WebSocket transport layer.
//!
//! This module handles communication with CDP targets over their debugger
//! WebSocket.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Harness (Rust)  │                              │  CDP target     │
//! │                  │         WebSocket            │  (page, worker, │
//! │  Connection ─────┼─────────────────────────────►│   iframe)       │
//! │  event loop task │  /devtools/<type>/<id>       │                 │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::connect` - Open the socket, spawn the event loop
//! 2. `Connection::send` / `Connection::on` - Commands and event waits
//! 3. `Connection::close` - Reject pending work, close the socket
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `server` | Scriptable mock target for tests |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Scriptable mock target.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, EventPredicate, Subscription};
pub use server::{MockPeer, MockRequest, MockTarget, mock_event};
