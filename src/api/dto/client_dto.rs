//! DTOs for listing and opening client streams.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::hub::ClientSummary;

/// Query parameters for `GET /sse`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StreamParams {
    /// Identifier to register under. Falls back to the `X-Client-Id` header,
    /// then to a generated UUID.
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Response body for `GET /clients`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClientListResponse {
    /// Connected clients, sorted by id.
    pub data: Vec<ClientSummary>,
    /// Number of connected clients.
    pub total: usize,
}
