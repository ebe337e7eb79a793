//! Match time translation.
//!
//! Turns the server's raw `(state, elapsed seconds)` pairs into what the
//! display shows: a state caption and a countdown for the current period.
//! Countdowns depend on the period durations announced by `matchTiming`,
//! which [`MatchClock`] caches.
//!
//! # Countdown Rules
//!
//! | State | Countdown |
//! |-------|-----------|
//! | pre-match, start, warmup | `auto` |
//! | auto | `warmup + auto - t` |
//! | pause | `teleop` |
//! | teleop | `warmup + auto + pause + teleop - t` |
//! | timeout active | `timeout - t` |
//! | post-match, post-timeout | `0` |
//!
//! All countdowns saturate at zero.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{MatchTimeData, MatchTiming, decode_data, event_names};

// ============================================================================
// TimeTranslator
// ============================================================================

/// Time-translation collaborator used by the display controller.
///
/// Receives the raw `matchTime` and `matchTiming` payloads.
pub trait TimeTranslator: Send + Sync {
    /// Translates a raw match-time payload and invokes `callback` with
    /// `(state, state_text, countdown_sec)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed or no timing
    /// configuration is known yet. The callback is not invoked then.
    fn translate_match_time(
        &self,
        data: &Value,
        callback: &mut dyn FnMut(MatchState, &str, u32),
    ) -> Result<()>;

    /// Updates the cached timing configuration from a raw payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed.
    fn handle_match_timing(&self, data: &Value) -> Result<()>;
}

// ============================================================================
// MatchState
// ============================================================================

/// Server-side match state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchState {
    /// Waiting for the match to start.
    PreMatch,
    /// Start requested.
    StartMatch,
    /// Warmup before autonomous.
    WarmupPeriod,
    /// Autonomous period.
    AutoPeriod,
    /// Pause between autonomous and teleoperated.
    PausePeriod,
    /// Teleoperated period.
    TeleopPeriod,
    /// Match over.
    PostMatch,
    /// Field timeout running.
    TimeoutActive,
    /// Field timeout over.
    PostTimeout,
}

impl MatchState {
    /// Returns the server's label for the state.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PreMatch => "PRE_MATCH",
            Self::StartMatch => "START_MATCH",
            Self::WarmupPeriod => "WARMUP_PERIOD",
            Self::AutoPeriod => "AUTO_PERIOD",
            Self::PausePeriod => "PAUSE_PERIOD",
            Self::TeleopPeriod => "TELEOP_PERIOD",
            Self::PostMatch => "POST_MATCH",
            Self::TimeoutActive => "TIMEOUT_ACTIVE",
            Self::PostTimeout => "POST_TIMEOUT",
        }
    }

    /// Returns the caption shown on displays.
    #[must_use]
    pub const fn display_text(self) -> &'static str {
        match self {
            Self::PreMatch => "PRE-MATCH",
            Self::StartMatch | Self::WarmupPeriod => "WARMUP",
            Self::AutoPeriod => "AUTONOMOUS",
            Self::PausePeriod => "PAUSE",
            Self::TeleopPeriod => "TELEOPERATED",
            Self::PostMatch => "POST-MATCH",
            Self::TimeoutActive | Self::PostTimeout => "TIMEOUT",
        }
    }

    /// Seconds left in the current period.
    #[must_use]
    pub fn countdown(self, timing: &MatchTiming, match_time_sec: i64) -> u32 {
        let warmup = i64::from(timing.warmup_duration_sec);
        let auto = i64::from(timing.auto_duration_sec);
        let pause = i64::from(timing.pause_duration_sec);
        let teleop = i64::from(timing.teleop_duration_sec);
        let timeout = i64::from(timing.timeout_duration_sec);

        let remaining = match self {
            Self::PreMatch | Self::StartMatch | Self::WarmupPeriod => auto,
            Self::AutoPeriod => (warmup + auto).saturating_sub(match_time_sec),
            Self::PausePeriod => teleop,
            Self::TeleopPeriod => (warmup + auto + pause + teleop).saturating_sub(match_time_sec),
            Self::TimeoutActive => timeout.saturating_sub(match_time_sec),
            Self::PostMatch | Self::PostTimeout => 0,
        };

        remaining.clamp(0, i64::from(u32::MAX)) as u32
    }
}

impl TryFrom<i64> for MatchState {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Ok(match value {
            0 => Self::PreMatch,
            1 => Self::StartMatch,
            2 => Self::WarmupPeriod,
            3 => Self::AutoPeriod,
            4 => Self::PausePeriod,
            5 => Self::TeleopPeriod,
            6 => Self::PostMatch,
            7 => Self::TimeoutActive,
            8 => Self::PostTimeout,
            other => return Err(Error::unknown_match_state(other)),
        })
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// MatchClock
// ============================================================================

/// Caches the latest match timing and translates match-time payloads.
#[derive(Debug, Default)]
pub struct MatchClock {
    timing: RwLock<Option<MatchTiming>>,
}

impl MatchClock {
    /// Creates a clock with no timing configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached timing configuration, if any.
    #[inline]
    #[must_use]
    pub fn timing(&self) -> Option<MatchTiming> {
        *self.timing.read()
    }
}

impl TimeTranslator for MatchClock {
    fn translate_match_time(
        &self,
        data: &Value,
        callback: &mut dyn FnMut(MatchState, &str, u32),
    ) -> Result<()> {
        let data: MatchTimeData = decode_data(event_names::MATCH_TIME, data)?;
        let state = MatchState::try_from(data.match_state)?;
        let timing = self.timing().ok_or(Error::TimingUnavailable)?;

        let countdown = state.countdown(&timing, data.match_time_sec);
        callback(state, state.display_text(), countdown);
        Ok(())
    }

    fn handle_match_timing(&self, data: &Value) -> Result<()> {
        let timing: MatchTiming = decode_data(event_names::MATCH_TIMING, data)?;

        debug!(?timing, "Match timing updated");
        *self.timing.write() = Some(timing);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
