//! WebSocket protocol message types.
//!
//! This module defines the message format exchanged with the event server
//! over the display websocket.
//!
//! # Protocol Overview
//!
//! Every frame is a JSON text frame with the same envelope:
//!
//! ```json
//! { "type": "matchTime", "data": { "MatchState": 3, "MatchTimeSec": 7 } }
//! ```
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `matchLoad` | Server → Display | Match/queue context (re)established |
//! | `matchTime` | Server → Display | Live match state and elapsed time |
//! | `matchTiming` | Server → Display | Period durations used for countdowns |
//! | `error` | Server → Display | Error text |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Event names and typed payloads |
//! | `message` | The `{type, data}` envelope |

// ============================================================================
// Submodules
// ============================================================================

/// Event names and typed payloads.
pub mod event;

/// The `{type, data}` message envelope.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{MatchTimeData, MatchTiming, event_names};
pub use message::{Message, decode_data};
