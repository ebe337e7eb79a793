//! Display configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use queueing_display::DisplayOptions;
//!
//! let options = DisplayOptions::new()
//!     .with_server("http://10.0.100.5:8080")
//!     .with_query("displayId", "100")
//!     .with_reconnect_delay(Duration::from_secs(1));
//!
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{DEFAULT_RECONNECT_DELAY, Endpoint, WebSocketTransport};

// ============================================================================
// Constants
// ============================================================================

/// Default event server base URL.
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// Default timeout for page and image requests.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// DisplayOptions
// ============================================================================

/// Queueing display configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Event server base URL (`http` or `https`).
    pub server: String,

    /// Query pairs sent with the page and websocket requests.
    pub query: Vec<(String, String)>,

    /// Delay between reconnect attempts and page reload retries.
    pub reconnect_delay: Duration,

    /// Timeout for page and image requests.
    pub http_timeout: Duration,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            query: Vec::new(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl DisplayOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event server base URL.
    #[inline]
    #[must_use]
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Adds a query pair.
    #[inline]
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the HTTP timeout.
    #[inline]
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

// ============================================================================
// Validation & Conversion
// ============================================================================

impl DisplayOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a duration is zero or the server URL is not http(s)
    /// - [`Error::Url`] if the server URL does not parse
    pub fn validate(&self) -> Result<()> {
        if self.reconnect_delay.is_zero() {
            return Err(Error::config("reconnect delay must be greater than zero"));
        }
        if self.http_timeout.is_zero() {
            return Err(Error::config("HTTP timeout must be greater than zero"));
        }
        self.endpoint().map(|_| ())
    }

    /// Builds the server endpoint.
    ///
    /// # Errors
    ///
    /// Same as [`Endpoint::parse`].
    pub fn endpoint(&self) -> Result<Endpoint> {
        let endpoint = Endpoint::parse(&self.server)?;
        Ok(self
            .query
            .iter()
            .fold(endpoint, |endpoint, (key, value)| endpoint.with_query(key, value)))
    }

    /// Builds the websocket transport.
    ///
    /// # Errors
    ///
    /// Same as [`DisplayOptions::validate`].
    pub fn transport(&self) -> Result<WebSocketTransport> {
        self.validate()?;
        Ok(WebSocketTransport::new(self.endpoint()?).with_reconnect_delay(self.reconnect_delay))
    }
}

// ============================================================================
// Tests
// ============================================================================
