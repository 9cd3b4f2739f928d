//! DTOs for pushing events through the REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Event;

/// Request body for `POST /clients/{id}/events` and `POST /events`.
///
/// Field names follow the wire format: `event`, `id`, `retry`, `data`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendEventRequest {
    /// Event type token (`event:` line).
    #[serde(default)]
    pub event: Option<String>,
    /// Event id (`id:` line).
    #[serde(default)]
    pub id: Option<String>,
    /// Reconnect hint in milliseconds (`retry:` line).
    #[serde(default)]
    pub retry: Option<u64>,
    /// Arbitrary JSON payload (`data:` line).
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SendEventRequest {
    /// Converts the request into a domain [`Event`].
    #[must_use]
    pub fn into_event(self) -> Event {
        Event {
            kind: self.event,
            id: self.id,
            retry_millis: self.retry,
            payload: self.data,
        }
    }
}

/// Response body for a point-to-point send (202 Accepted).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendEventResponse {
    /// `true` if the event was queued for the client; `false` if the client
    /// is not connected or its queue is full.
    pub delivered: bool,
}

/// Response body for a broadcast (202 Accepted).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BroadcastResponse {
    /// Number of clients the event was queued for.
    pub delivered: usize,
}
