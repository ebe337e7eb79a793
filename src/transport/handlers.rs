//! Named message handlers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::{Message, event_names};

// ============================================================================
// Types
// ============================================================================

/// Handler callback type.
///
/// Receives the whole message; the payload is in [`Message::data`].
/// Errors are logged by the dispatcher and never stop delivery.
pub type Handler = Box<dyn Fn(&Message) -> Result<()> + Send + Sync>;

// ============================================================================
// HandlerMap
// ============================================================================

/// Mapping from message type to handler.
#[derive(Default)]
pub struct HandlerMap {
    handlers: FxHashMap<String, Handler>,
}

impl HandlerMap {
    /// Creates an empty map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler, builder style.
    #[must_use]
    pub fn on<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Message) -> Result<()> + Send + Sync + 'static,
    {
        self.insert(name, handler);
        self
    }

    /// Registers a handler, replacing any previous one for `name`.
    pub fn insert<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Message) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    /// Installs a logging `error` handler unless one is registered.
    pub fn ensure_error_handler(&mut self) {
        self.handlers
            .entry(event_names::ERROR.to_string())
            .or_insert_with(|| {
                let handler: Handler = Box::new(|message: &Message| {
                    let text = message
                        .data_as::<String>()
                        .unwrap_or_else(|_| message.data.to_string());
                    warn!(error = %text, "Server reported error");
                    Ok(())
                });
                handler
            });
    }

    /// Returns `true` if a handler is registered for `name`.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Returns the number of registered handlers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handler is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invokes the handler registered for the message's type.
    ///
    /// Returns `false` if no handler is registered for it.
    pub fn dispatch(&self, message: &Message) -> bool {
        let Some(handler) = self.handlers.get(&message.message_type) else {
            debug!(message_type = %message.message_type, "No handler for message");
            return false;
        };

        if let Err(e) = handler(message) {
            if e.is_recoverable() {
                debug!(message_type = %message.message_type, error = %e, "Handler deferred");
            } else {
                warn!(message_type = %message.message_type, error = %e, "Handler failed");
            }
        }
        true
    }
}

impl fmt::Debug for HandlerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMap")
            .field("handlers", &self.names())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
