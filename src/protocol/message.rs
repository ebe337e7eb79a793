//! The `{type, data}` message envelope.

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str, from_value, to_string};

use crate::error::{Error, Result};

// ============================================================================
// Message
// ============================================================================

/// A named message travelling in either direction.
///
/// # Format
///
/// ```json
/// {
///   "type": "matchLoad",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Event name used to select a handler.
    #[serde(rename = "type")]
    pub message_type: String,

    /// Event payload. Schema is defined by the server per event name.
    #[serde(default)]
    pub data: Value,
}

impl Message {
    /// Creates a new message.
    #[inline]
    #[must_use]
    pub fn new(message_type: impl Into<String>, data: Value) -> Self {
        Self {
            message_type: message_type.into(),
            data,
        }
    }

    /// Parses a message from a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the frame is not a valid envelope.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(from_str(text)?)
    }

    /// Serializes the message into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(to_string(self)?)
    }

    /// Deserializes the payload into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] naming the message type if the payload
    /// does not match `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        decode_data(&self.message_type, &self.data)
    }
}

/// Deserializes the payload of a `message_type` message.
///
/// # Errors
///
/// Returns [`Error::Protocol`] naming the message type if `data` does not
/// match `T`.
pub fn decode_data<T: DeserializeOwned>(message_type: &str, data: &Value) -> Result<T> {
    from_value(data.clone())
        .map_err(|e| Error::protocol(format!("invalid {message_type} payload: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
