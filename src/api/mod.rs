//! HTTP layer: the event stream endpoint, REST push endpoints, and router
//! composition.
//!
//! Everything here is a thin caller of [`crate::hub::ConnectionRegistry`].
//! REST endpoints are mounted under `/api/v1`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for all HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "event-hub",
        description = "Server-Sent Events broadcast hub with addressable subscribers."
    ),
    paths(
        handlers::stream::stream_handler,
        handlers::clients::send_to_client,
        handlers::clients::broadcast,
        handlers::clients::list_clients,
        handlers::clients::close_client,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::SendEventRequest,
        dto::SendEventResponse,
        dto::BroadcastResponse,
        dto::ClientListResponse,
        crate::hub::ClientSummary,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
        handlers::system::HealthResponse,
    )),
    tags(
        (name = "Stream", description = "Event stream subscription"),
        (name = "Clients", description = "Push events and manage connected clients"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

/// Builds the complete router with all HTTP endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::stream::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, Bytes};
    use axum::http::{Request, StatusCode, header};
    use futures_util::StreamExt;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::{ClientId, Event};
    use crate::hub::ConnectionRegistry;

    const WAIT: Duration = Duration::from_secs(5);

    fn app() -> (Router, ConnectionRegistry) {
        let registry = ConnectionRegistry::default();
        let state = AppState {
            registry: registry.clone(),
        };
        (build_router().with_state(state), registry)
    }

    async fn call(app: &Router, request: Request<Body>) -> axum::response::Response {
        let Ok(response) = app.clone().oneshot(request).await;
        response
    }

    fn get(uri: &str) -> Request<Body> {
        let Ok(request) = Request::get(uri).body(Body::empty()) else {
            panic!("bad request");
        };
        request
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        let Ok(request) = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
        else {
            panic!("bad request");
        };
        request
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        let Ok(value) = serde_json::from_slice(&bytes) else {
            panic!("body is not json");
        };
        value
    }

    #[tokio::test]
    async fn health_reports_client_count() {
        let (app, _registry) = app();
        let response = call(&app, get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connected_clients"], 0);
    }

    #[tokio::test]
    async fn index_serves_html() {
        let (app, _registry) = app();
        let response = call(&app, get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get(header::CONTENT_TYPE);
        assert!(content_type.is_some_and(|v| v.as_bytes().starts_with(b"text/html")));
    }

    #[tokio::test]
    async fn stream_receives_pushed_event() {
        let (app, _registry) = app();
        let response = call(&app, get("/sse?client_id=A")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"text/event-stream"[..])
        );
        assert_eq!(
            response.headers().get("x-client-id").map(|v| v.as_bytes()),
            Some(&b"A"[..])
        );
        let mut body = response.into_body().into_data_stream();

        let send = call(
            &app,
            post_json(
                "/api/v1/clients/A/events",
                &serde_json::json!({"event": "ping", "id": "1", "data": {"user": 1}}),
            ),
        )
        .await;
        assert_eq!(send.status(), StatusCode::ACCEPTED);
        assert_eq!(json_body(send).await["delivered"], true);

        let Ok(Some(Ok(frame))) = tokio::time::timeout(WAIT, body.next()).await else {
            panic!("no frame on stream");
        };
        assert_eq!(frame, Bytes::from_static(b"event: ping\nid: 1\ndata: {\"user\":1}\n\n"));
    }

    #[tokio::test]
    async fn duplicate_stream_is_conflict() {
        let (app, _registry) = app();
        let first = call(&app, get("/sse?client_id=A")).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = call(&app, get("/sse?client_id=A")).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(second).await["error"]["code"], 2002);
        drop(first);
    }

    #[tokio::test]
    async fn dropping_stream_body_unregisters() {
        let (app, registry) = app();
        let response = call(&app, get("/sse?client_id=gone")).await;
        assert!(registry.contains(&ClientId::from("gone")).await);
        drop(response);

        let emptied = tokio::time::timeout(WAIT, async {
            while !registry.is_empty().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(emptied.is_ok(), "client still registered after disconnect");
    }

    #[tokio::test]
    async fn send_to_unknown_client_reports_not_delivered() {
        let (app, _registry) = app();
        let response = call(
            &app,
            post_json("/api/v1/clients/nobody/events", &serde_json::json!({"data": 1})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(json_body(response).await["delivered"], false);
    }

    #[tokio::test]
    async fn unencodable_event_is_bad_request() {
        let (app, _registry) = app();
        let response = call(
            &app,
            post_json(
                "/api/v1/events",
                &serde_json::json!({"event": "two\nlines", "data": 1}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], 1002);
    }

    #[tokio::test]
    async fn broadcast_list_and_close() {
        let (app, registry) = app();
        let mut streams = Vec::new();
        for id in ["A", "B", "C"] {
            let Ok(pair) = registry.register(ClientId::from(id)).await else {
                panic!("registration failed");
            };
            streams.push(pair);
        }

        let closed = call(
            &app,
            Request::delete("/api/v1/clients/C")
                .body(Body::empty())
                .unwrap_or_default(),
        )
        .await;
        assert_eq!(closed.status(), StatusCode::NO_CONTENT);

        let again = call(
            &app,
            Request::delete("/api/v1/clients/C")
                .body(Body::empty())
                .unwrap_or_default(),
        )
        .await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);

        let response = call(
            &app,
            post_json("/api/v1/events", &serde_json::json!({"event": "news", "data": "hi"})),
        )
        .await;
        assert_eq!(json_body(response).await["delivered"], 2);

        let list = json_body(call(&app, get("/api/v1/clients")).await).await;
        assert_eq!(list["total"], 2);
        assert_eq!(list["data"][0]["client_id"], "A");
        assert_eq!(list["data"][1]["client_id"], "B");
    }

    #[test]
    fn openapi_lists_stream_path() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/sse"));
        assert!(doc.paths.paths.contains_key("/api/v1/clients/{id}/events"));
    }

    #[tokio::test]
    async fn end_to_end_over_tcp() {
        let (app, registry) = app();
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = reqwest::Client::new();
        let Ok(mut stream) = client
            .get(format!("http://{addr}/sse?client_id=e2e"))
            .send()
            .await
        else {
            panic!("stream request failed");
        };
        assert_eq!(stream.status(), reqwest::StatusCode::OK);

        let Ok(sent) = client
            .post(format!("http://{addr}/api/v1/clients/e2e/events"))
            .json(&serde_json::json!({"event": "greeting", "data": {"text": "hello"}}))
            .send()
            .await
        else {
            panic!("send request failed");
        };
        assert_eq!(sent.status(), reqwest::StatusCode::ACCEPTED);

        let Ok(Ok(Some(chunk))) = tokio::time::timeout(WAIT, stream.chunk()).await else {
            panic!("no chunk received");
        };
        assert_eq!(
            &chunk[..],
            b"event: greeting\ndata: {\"text\":\"hello\"}\n\n"
        );

        // The server notices the disconnect on its next write.
        drop(stream);
        let emptied = tokio::time::timeout(WAIT, async {
            while !registry.is_empty().await {
                let _ = registry.broadcast(&Event::new(serde_json::Value::Null)).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(emptied.is_ok(), "disconnected client never unregistered");
        server.abort();
    }
}
