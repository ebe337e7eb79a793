//! Error types for the queueing display.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use queueing_display::{MatchClock, Result};
//!
//! fn example(clock: &MatchClock, data: &serde_json::Value) -> Result<()> {
//!     clock.handle_match_timing(data)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::UnknownMatchState`] |
//! | Timing | [`Error::TimingUnavailable`] |
//! | Page | [`Error::PageLoad`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Url`], [`Error::Http`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when display options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The session was shut down.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed or unexpected message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Match state integer outside the known range.
    #[error("Unknown match state: {value}")]
    UnknownMatchState {
        /// Raw value received from the server.
        value: i64,
    },

    // ========================================================================
    // Timing Errors
    // ========================================================================
    /// A match-time message arrived before any match-timing configuration.
    #[error("Match timing configuration not received yet")]
    TimingUnavailable,

    // ========================================================================
    // Page Errors
    // ========================================================================
    /// Fetching the display page failed.
    #[error("Failed to load page {url}: {message}")]
    PageLoad {
        /// Page URL.
        url: String,
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unknown match state error.
    #[inline]
    pub fn unknown_match_state(value: i64) -> Self {
        Self::UnknownMatchState { value }
    }

    /// Creates a page load error.
    #[inline]
    pub fn page_load(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PageLoad {
            url: url.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the error was caused by a bad server payload.
    #[inline]
    #[must_use]
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::UnknownMatchState { .. } | Self::Json(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed once the server sends more data or
    /// the connection is re-established.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::TimingUnavailable
                | Self::PageLoad { .. }
                | Self::WebSocket(_)
                | Self::Http(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
