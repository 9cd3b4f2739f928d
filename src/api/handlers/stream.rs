//! Stream endpoints: the event stream itself and a demo page.

use std::convert::Infallible;

use axum::Router;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use futures_util::StreamExt;

use crate::api::dto::StreamParams;
use crate::app_state::AppState;
use crate::domain::ClientId;
use crate::error::{ErrorResponse, HubError};

/// Header carrying the client id, on requests and on stream responses.
pub const CLIENT_ID_HEADER: HeaderName = HeaderName::from_static("x-client-id");

const NO_CACHE: &str = "private, no-cache, no-store, must-revalidate, max-age=0, no-transform";

const MAX_CLIENT_ID_LEN: usize = 128;

/// `GET /sse` — Open a server-sent event stream.
///
/// # Errors
///
/// Returns [`HubError::DuplicateClient`] if the id is already connected and
/// [`HubError::InvalidRequest`] if the id is empty, too long, or contains
/// control characters.
#[utoipa::path(
    get,
    path = "/sse",
    tag = "Stream",
    summary = "Open an event stream",
    description = "Registers the caller as a subscriber and keeps the response open as a `text/event-stream`. The client id comes from the `client_id` query parameter, then the `X-Client-Id` header, else a UUID is generated and echoed in the `X-Client-Id` response header.",
    params(StreamParams),
    responses(
        (status = 200, description = "Event stream", body = String, content_type = "text/event-stream"),
        (status = 400, description = "Invalid client id", body = ErrorResponse),
        (status = 409, description = "Client id already connected", body = ErrorResponse),
    )
)]
pub async fn stream_handler(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
    headers: HeaderMap,
) -> Result<Response, HubError> {
    let client_id = resolve_client_id(params.client_id, &headers)?;
    let id_header = HeaderValue::from_str(client_id.as_str())
        .map_err(|_| HubError::InvalidRequest("client id is not a valid header value".into()))?;

    let (_handle, frames) = state.registry.register(client_id).await?;
    let body = Body::from_stream(frames.map(Ok::<_, Infallible>));

    let mut response = Response::new(body);
    let response_headers = response.headers_mut();
    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    response_headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    response_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    response_headers.insert(CLIENT_ID_HEADER, id_header);
    Ok(response)
}

/// Picks the client id from the query, then the header, else generates one.
fn resolve_client_id(query: Option<String>, headers: &HeaderMap) -> Result<ClientId, HubError> {
    let supplied = query.or_else(|| {
        headers
            .get(&CLIENT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });
    let Some(raw) = supplied else {
        return Ok(ClientId::generate());
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HubError::InvalidRequest("client id must not be empty".into()));
    }
    if trimmed.len() > MAX_CLIENT_ID_LEN {
        return Err(HubError::InvalidRequest(format!(
            "client id longer than {MAX_CLIENT_ID_LEN} bytes"
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(HubError::InvalidRequest(
            "client id must not contain control characters".into(),
        ));
    }
    Ok(ClientId::from(trimmed))
}

/// `GET /` — Demo page that subscribes and prints incoming events.
pub async fn index_handler() -> impl IntoResponse {
    Html(include_str!("../index.html"))
}

/// Stream routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index_handler))
        .route("/sse", get(stream_handler))
}
