//! Client endpoints: push to one client, broadcast, list, and close.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::dto::{BroadcastResponse, ClientListResponse, SendEventRequest, SendEventResponse};
use crate::app_state::AppState;
use crate::domain::ClientId;
use crate::error::{ErrorResponse, HubError};

/// `POST /clients/{id}/events` — Push an event to one client.
///
/// # Errors
///
/// Returns [`HubError::Encode`] if the event cannot be framed.
#[utoipa::path(
    post,
    path = "/api/v1/clients/{id}/events",
    tag = "Clients",
    summary = "Send an event to one client",
    description = "Queues the event on the client's stream. An unknown or disconnected client is not an error: the response reports `delivered: false`.",
    params(
        ("id" = String, Path, description = "Client id"),
    ),
    request_body = SendEventRequest,
    responses(
        (status = 202, description = "Send attempted", body = SendEventResponse),
        (status = 400, description = "Event cannot be encoded", body = ErrorResponse),
    )
)]
pub async fn send_to_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendEventRequest>,
) -> Result<impl IntoResponse, HubError> {
    let event = req.into_event();
    let delivered = state.registry.send_to(&ClientId::from(id), &event).await?;
    Ok((StatusCode::ACCEPTED, Json(SendEventResponse { delivered })))
}

/// `POST /events` — Broadcast an event to every connected client.
///
/// # Errors
///
/// Returns [`HubError::Encode`] if the event cannot be framed.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Clients",
    summary = "Broadcast an event",
    description = "Queues the event on every connected client's stream and reports how many accepted it.",
    request_body = SendEventRequest,
    responses(
        (status = 202, description = "Broadcast attempted", body = BroadcastResponse),
        (status = 400, description = "Event cannot be encoded", body = ErrorResponse),
    )
)]
pub async fn broadcast(
    State(state): State<AppState>,
    Json(req): Json<SendEventRequest>,
) -> Result<impl IntoResponse, HubError> {
    let event = req.into_event();
    let delivered = state.registry.broadcast(&event).await?;
    Ok((StatusCode::ACCEPTED, Json(BroadcastResponse { delivered })))
}

/// `GET /clients` — List connected clients.
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    tag = "Clients",
    summary = "List connected clients",
    responses(
        (status = 200, description = "Connected clients", body = ClientListResponse),
    )
)]
pub async fn list_clients(State(state): State<AppState>) -> impl IntoResponse {
    let data = state.registry.clients().await;
    let total = data.len();
    Json(ClientListResponse { data, total })
}

/// `DELETE /clients/{id}` — Close a client's stream.
///
/// # Errors
///
/// Returns [`HubError::ClientNotFound`] if no client is connected under `id`.
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    tag = "Clients",
    summary = "Close a client stream",
    params(
        ("id" = String, Path, description = "Client id"),
    ),
    responses(
        (status = 204, description = "Stream closed"),
        (status = 404, description = "Client not connected", body = ErrorResponse),
    )
)]
pub async fn close_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, HubError> {
    let id = ClientId::from(id);
    if state.registry.unregister(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HubError::ClientNotFound(id))
    }
}

/// Client routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients))
        .route("/clients/{id}", delete(close_client))
        .route("/clients/{id}/events", post(send_to_client))
        .route("/events", post(broadcast))
}
