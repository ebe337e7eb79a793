//! Queueing display - live match queue display for event servers.
//!
//! This library drives the queueing display of an event field server: it
//! keeps a websocket open to the server, reacts to match pushes, and keeps
//! the match state caption and countdown on the display current.
//!
//! # Architecture
//!
//! The display follows a page-session model:
//!
//! - **Runtime**: loads the page, starts the controller, reloads on request
//! - **Controller**: registers the `matchLoad`, `matchTime` and
//!   `matchTiming` handlers on one transport session
//! - **Transport**: websocket client dispatching `{type, data}` messages to
//!   named handlers, one at a time, reconnecting on loss
//!
//! Key design principles:
//!
//! - Each page session owns: page model + match clock + websocket connection
//! - A reload discards the whole session and starts a new one
//! - Collaborators sit behind ports ([`Display`], [`Navigator`],
//!   [`TimeTranslator`], [`Transport`]) so the controller is testable alone
//!
//! # Quick Start
//!
//! ```no_run
//! use queueing_display::{DisplayOptions, HttpPageLoader, Result, run};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let options = DisplayOptions::new().with_server("http://10.0.100.5:8080");
//!     let loader = HttpPageLoader::new(&options)?;
//!     let (renders, _lines) = tokio::sync::watch::channel(String::new());
//!
//!     run(&options, &loader, renders, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`controller`] | The queueing display controller |
//! | [`display`] | Text regions, avatars, countdown formatting |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`options`] | Display configuration |
//! | [`protocol`] | WebSocket message types |
//! | [`runtime`] | Page session loop |
//! | [`timing`] | Match time translation |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Queueing display controller.
///
/// [`QueueingDisplay`] owns one page session's transport handle and
/// load state.
pub mod controller;

/// Display surface: text regions and avatar images.
pub mod display;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Display configuration.
pub mod options;

/// WebSocket protocol message types.
pub mod protocol;

/// Page session runtime.
pub mod runtime;

/// Match time translation.
pub mod timing;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Controller types
pub use controller::{LoadState, Navigator, Ports, QUEUEING_WEBSOCKET_PATH, QueueingDisplay};

// Display types
pub use display::{AVATAR_PLACEHOLDER, Avatar, Display, Page, TextRegion, format_countdown};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::SessionId;

// Configuration
pub use options::DisplayOptions;

// Protocol types
pub use protocol::{MatchTimeData, MatchTiming, Message};

// Runtime
pub use runtime::{HttpPageLoader, PageLoader, ReloadSignal, run};

// Timing
pub use timing::{MatchClock, MatchState, TimeTranslator};

// Transport types
pub use transport::{Connection, Endpoint, HandlerMap, Transport, WebSocketTransport};
