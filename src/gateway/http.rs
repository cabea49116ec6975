//! HTTP listener adapter: every path and method is handed to the gateway.

use crate::error::Result;
use crate::gateway::{Gateway, GatewayRequest, GatewayResponse};
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub fn router(gateway: Arc<Gateway>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static("mcp-session-id"),
            HeaderName::from_static("mcp-protocol-version"),
            HeaderName::from_static("www-authenticate"),
        ]);

    Router::new()
        .fallback(handle_request)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(gateway)
}

/// Bind and serve until `shutdown` fires.
pub async fn serve(addr: SocketAddr, gateway: Arc<Gateway>, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "MCP HTTP gateway listening");

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("HTTP gateway stopped");
    Ok(())
}

async fn handle_request(
    State(gateway): State<Arc<Gateway>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request = GatewayRequest {
        http_method: method.as_str().to_string(),
        path: uri.path().to_string(),
        stage: String::new(),
        headers: collect_headers(&headers),
        body,
    };

    // Dropping this future (client went away) cancels in-flight tool calls.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    into_response(gateway.handle(request, cancel).await)
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut out = HashMap::with_capacity(headers.len());
    for (name, value) in headers {
        match value.to_str() {
            Ok(value) => {
                out.entry(name.as_str().to_string())
                    .or_insert_with(|| value.to_string());
            }
            Err(_) => warn!("Dropping non-ASCII header value for {}", name),
        }
    }
    out
}

fn into_response(response: GatewayResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = status;

    for (name, value) in response.headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().insert(name, value);
            }
            _ => warn!("Skipping invalid response header {}", name),
        }
    }

    out.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerState;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = Arc::new(ServerState::builder().build().unwrap());
        router(Arc::new(Gateway::new(state)))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_status() {
        let response = app()
            .oneshot(Request::get("/mcp").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "MCP Server is running");
    }

    #[tokio::test]
    async fn test_initialize_over_http() {
        let request = Request::post("/mcp")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            ))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let session = response.headers().get("mcp-session-id").unwrap();
        assert_eq!(session.len(), 32);
        assert_eq!(
            response.headers().get("mcp-protocol-version").unwrap(),
            "2025-06-18"
        );
        assert_eq!(body_json(response).await["id"], 1);
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let response = app()
            .oneshot(Request::put("/mcp").body(Body::from("{}")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_into_response_copies_headers() {
        let response = into_response(
            GatewayResponse::empty(202).with_header("Mcp-Session-Id", "abc"),
        );
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get("mcp-session-id").unwrap(), "abc");
        assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");
    }
}
