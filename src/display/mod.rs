//! Display surface: text regions and avatar images.
//!
//! The controller never touches a concrete page. It writes through the
//! [`Display`] port, which [`Page`] implements for the in-process page model.
//!
//! # Regions
//!
//! | Region | Element id | Content |
//! |--------|------------|---------|
//! | [`TextRegion::MatchState`] | `matchState` | State caption, e.g. `AUTONOMOUS` |
//! | [`TextRegion::MatchTime`] | `matchTime` | Countdown, e.g. `2:05` |

// ============================================================================
// Submodules
// ============================================================================

/// Avatar image element with load-failure fallback.
pub mod avatar;

/// In-process page model.
pub mod page;

// ============================================================================
// Re-exports
// ============================================================================

pub use avatar::Avatar;
pub use page::Page;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Image shown when a team avatar fails to load.
pub const AVATAR_PLACEHOLDER: &str = "/static/img/avatars/0.png";

/// Class carried by avatar image elements.
pub const AVATAR_CLASS: &str = "avatar";

// ============================================================================
// TextRegion
// ============================================================================

/// A named text region on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextRegion {
    /// Match state caption.
    MatchState,
    /// Match countdown.
    MatchTime,
}

impl TextRegion {
    /// Returns the element id of the region.
    #[must_use]
    pub const fn element_id(self) -> &'static str {
        match self {
            Self::MatchState => "matchState",
            Self::MatchTime => "matchTime",
        }
    }
}

impl fmt::Display for TextRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_id())
    }
}

// ============================================================================
// Display
// ============================================================================

/// Output port for the display controller.
pub trait Display: Send + Sync {
    /// Replaces the text content of a region.
    fn set_text(&self, region: TextRegion, text: &str);

    /// Makes every avatar fall back to `fallback_src` when its image fails
    /// to load.
    fn install_avatar_fallback(&self, fallback_src: &str);
}

// ============================================================================
// Countdown Formatting
// ============================================================================

/// Formats a countdown as `minutes:seconds`.
///
/// Minutes are unpadded, seconds are always two digits.
///
/// # Example
///
/// ```
/// use queueing_display::display::format_countdown;
///
/// assert_eq!(format_countdown(125), "2:05");
/// assert_eq!(format_countdown(3600), "60:00");
/// ```
#[must_use]
pub fn format_countdown(countdown_sec: u32) -> String {
    format!("{}:{:02}", countdown_sec / 60, countdown_sec % 60)
}

// ============================================================================
// Tests
// ============================================================================
