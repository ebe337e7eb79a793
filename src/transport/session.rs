//! Transport abstraction.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::info;

use crate::error::Result;

use super::{Connection, DEFAULT_RECONNECT_DELAY, Endpoint, HandlerMap};

// ============================================================================
// Transport
// ============================================================================

/// Opens message-dispatching sessions.
///
/// One call to [`Transport::open`] is one session: a persistent connection
/// to `path` delivering each named message to its handler.
pub trait Transport {
    /// Handle kept by the caller for the lifetime of the session.
    type Session: Send + Sync + 'static;

    /// Opens a session against `path` with the given handlers.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be started.
    fn open(&self, path: &str, handlers: HandlerMap) -> Result<Self::Session>;
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// [`Transport`] over websockets to the event server.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    /// Server addressing.
    endpoint: Endpoint,
    /// Delay between reconnect attempts.
    reconnect_delay: Duration,
}

impl WebSocketTransport {
    /// Creates a transport with the default reconnect delay.
    #[inline]
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Returns the endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl Transport for WebSocketTransport {
    type Session = Connection;

    fn open(&self, path: &str, handlers: HandlerMap) -> Result<Connection> {
        let url = self.endpoint.websocket_url(path)?;
        info!(%url, handlers = ?handlers.names(), "Opening websocket session");
        Connection::open(url, handlers, self.reconnect_delay)
    }
}

// ============================================================================
// Tests
// ============================================================================
