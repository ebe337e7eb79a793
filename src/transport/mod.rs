//! WebSocket transport layer.
//!
//! This module handles communication between the display and the event
//! server via websocket.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Display (Rust) │                              │  Event server   │
//! │                 │         WebSocket            │                 │
//! │  Connection     │◄────────────────────────────►│  /displays/...  │
//! │  → HandlerMap   │      {"type", "data"}        │  /websocket     │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::open` - Derive the websocket URL and spawn the tasks
//! 2. Socket task connects; inbound frames enter the dispatch queue
//! 3. Dispatch task runs the named handler for each message, in order
//! 4. On disconnect, reconnect after the configured delay
//! 5. `Connection::shutdown` (or drop) - Stop both tasks
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `endpoint` | URL derivation from the server base URL |
//! | `handlers` | Named handler registry and dispatch |
//! | `session` | `Transport` trait and websocket implementation |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Server endpoint addressing.
pub mod endpoint;

/// Named message handlers.
pub mod handlers;

/// Transport abstraction.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, DEFAULT_RECONNECT_DELAY};
pub use endpoint::Endpoint;
pub use handlers::{Handler, HandlerMap};
pub use session::{Transport, WebSocketTransport};
