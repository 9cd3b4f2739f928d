//! Events pushed to subscribers.
//!
//! An [`Event`] is an immutable value describing one frame of a server-push
//! stream: an optional type token, an optional resumption id, an optional
//! reconnect hint and a JSON payload.

use serde::Serialize;

use super::encoder::EncodeError;

/// One discrete event destined for a subscriber's stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Short token classifying the event (`event:` line), e.g. `"ping"`.
    pub kind: Option<String>,
    /// Identifier for the client's last-event-id resumption (`id:` line).
    pub id: Option<String>,
    /// Reconnect delay hint in milliseconds (`retry:` line).
    pub retry_millis: Option<u64>,
    /// JSON payload (`data:` line).
    pub payload: serde_json::Value,
}

impl Event {
    /// Creates an event carrying `payload` with no optional fields set.
    #[must_use]
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            kind: None,
            id: None,
            retry_millis: None,
            payload,
        }
    }

    /// Serializes `payload` into a new event.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Payload`] if `payload` cannot be represented
    /// as JSON (e.g. a map with non-string keys).
    pub fn json<T: Serialize + ?Sized>(payload: &T) -> Result<Self, EncodeError> {
        let value = serde_json::to_value(payload).map_err(EncodeError::Payload)?;
        Ok(Self::new(value))
    }

    /// Sets the event type.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the event id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the reconnect hint.
    #[must_use]
    pub const fn with_retry(mut self, millis: u64) -> Self {
        self.retry_millis = Some(millis);
        self
    }
}
