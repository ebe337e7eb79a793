//! Event names and typed payloads.
//!
//! Payload field names follow the server's JSON encoding (`PascalCase`).
//!
//! # Event Types
//!
//! | Event | Payload |
//! |-------|---------|
//! | `matchLoad` | Opaque, ignored by the display |
//! | `matchTime` | [`MatchTimeData`] |
//! | `matchTiming` | [`MatchTiming`] |
//! | `error` | Error string |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Event Names
// ============================================================================

/// Message type names understood by the display.
pub mod event_names {
    /// Match/queue context (re)established.
    pub const MATCH_LOAD: &str = "matchLoad";

    /// Live match state and elapsed seconds.
    pub const MATCH_TIME: &str = "matchTime";

    /// Period durations.
    pub const MATCH_TIMING: &str = "matchTiming";

    /// Server-reported error text.
    pub const ERROR: &str = "error";
}

// ============================================================================
// MatchTimeData
// ============================================================================

/// Raw match-time payload.
///
/// # Format
///
/// ```json
/// { "MatchState": 3, "MatchTimeSec": 7 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MatchTimeData {
    /// Server match state as an integer.
    pub match_state: i64,

    /// Seconds elapsed since the match started.
    #[serde(default)]
    pub match_time_sec: i64,
}

// ============================================================================
// MatchTiming
// ============================================================================

/// Period durations in whole seconds.
///
/// Missing fields default to zero so older servers without warmup or
/// timeout support still decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MatchTiming {
    /// Warmup period before autonomous.
    pub warmup_duration_sec: u32,

    /// Autonomous period.
    pub auto_duration_sec: u32,

    /// Pause between autonomous and teleoperated.
    pub pause_duration_sec: u32,

    /// Teleoperated period.
    pub teleop_duration_sec: u32,

    /// Remaining time at which the end-of-match warning sounds.
    pub warning_remaining_duration_sec: u32,

    /// Field timeout length.
    pub timeout_duration_sec: u32,
}

// ============================================================================
// Tests
// ============================================================================
