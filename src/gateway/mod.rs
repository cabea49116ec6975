//! Request admission pipeline.
//!
//! Every transport funnels requests through [`Gateway::handle`], which runs
//! the stages in order and stops at the first one that produces a response:
//! protocol version check, well-known metadata, HTTP method checks,
//! authentication, session resolution, JSON-RPC decoding and dispatch.

pub mod envelope;
pub mod http;
pub mod serverless;

pub use envelope::{GatewayRequest, GatewayResponse, ProxyRequest, ProxyResponse};

use crate::auth::WELL_KNOWN_RESOURCE_PATH;
use crate::protocol::{
    Dispatcher, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestContext,
    SUPPORTED_PROTOCOL_VERSIONS, version,
};
use crate::server::{McpHandler, ServerState};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const PROTOCOL_VERSION_HEADER: &str = "MCP-Protocol-Version";
pub const SESSION_ID_HEADER: &str = "Mcp-Session-Id";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

const WELL_KNOWN_MARKER: &str = "/.well-known/";
const METADATA_CACHE_CONTROL: &str = "public, max-age=3600";
const ALLOWED_METHODS: &str = "GET, POST, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, Mcp-Session-Id, MCP-Protocol-Version";
const EXPOSED_HEADERS: &str = "Mcp-Session-Id, MCP-Protocol-Version, WWW-Authenticate";

/// `true` for JSON-RPC messages that never get a reply.
fn is_notification(request: &JsonRpcRequest) -> bool {
    request.is_notification()
        && (request.method.starts_with("notifications/") || request.method == "initialized")
}

/// Resource path advertised for a well-known metadata request, if recognized.
///
/// `/.well-known/oauth-protected-resource` describes `/`, and
/// `/.well-known/oauth-protected-resource/mcp` describes `/mcp`.
fn well_known_resource_path(path: &str) -> Option<&str> {
    let start = path.find(WELL_KNOWN_MARKER)?;
    let rest = path[start..].strip_prefix(WELL_KNOWN_RESOURCE_PATH)?;
    match rest {
        "" => Some("/"),
        r if r.starts_with('/') => Some(r),
        _ => None,
    }
}

fn error_body(error: &str, description: impl Into<String>) -> Value {
    json!({ "error": error, "error_description": description.into() })
}

pub struct Gateway {
    state: Arc<ServerState>,
    handler: McpHandler,
}

impl Gateway {
    pub fn new(state: Arc<ServerState>) -> Self {
        let handler = McpHandler::new(Arc::clone(&state));
        Self { state, handler }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Run one request through the pipeline.
    ///
    /// `cancel` is handed to tool handlers; the transport cancels it when the
    /// caller goes away.
    #[instrument(skip_all, fields(method = %request.http_method, path = %request.path))]
    pub async fn handle(&self, request: GatewayRequest, cancel: CancellationToken) -> GatewayResponse {
        let request_no = self.state.next_request_id();
        debug!("Gateway request #{}", request_no);

        let requested_version = request.header(PROTOCOL_VERSION_HEADER);
        if !version::validate(requested_version) {
            warn!("Unsupported protocol version: {:?}", requested_version);
            return GatewayResponse::json(
                400,
                &json!({
                    "error": "unsupported_protocol_version",
                    "supported_versions": SUPPORTED_PROTOCOL_VERSIONS,
                }),
            );
        }
        let negotiated = version::negotiated(requested_version).to_string();

        if request.path.contains(WELL_KNOWN_MARKER) {
            return self.well_known(&request);
        }

        match request.http_method.as_str() {
            "POST" | "DELETE" => {}
            "GET" => return self.status(),
            "OPTIONS" => return preflight(),
            other => {
                debug!("Method not allowed: {}", other);
                return GatewayResponse::json(
                    405,
                    &error_body("method_not_allowed", format!("{} is not supported", other)),
                )
                .with_header("Allow", ALLOWED_METHODS);
            }
        }

        let is_delete = request.http_method == "DELETE";
        if !is_delete && request.body.trim().is_empty() {
            return GatewayResponse::json(400, &error_body("invalid_request", "Request body is empty"));
        }

        if let Err(e) = self
            .state
            .auth
            .authenticate(request.header(AUTHORIZATION_HEADER))
            .await
        {
            return self.state.auth.reject(request.host(), &e).into();
        }

        let session_header = request.header(SESSION_ID_HEADER);

        if is_delete {
            return match session_header {
                Some(id) => {
                    if self.state.sessions.delete_session(id) {
                        info!("Session terminated: {}", id);
                    }
                    GatewayResponse::empty(204).with_header(PROTOCOL_VERSION_HEADER, negotiated)
                }
                None => GatewayResponse::json(
                    400,
                    &error_body("invalid_request", "Mcp-Session-Id header is required"),
                ),
            };
        }

        let session_id = session_header.and_then(|id| match self.state.sessions.get_session(id) {
            Some(session) => Some(session.id),
            None => {
                warn!("Unknown session id {}, continuing without a session", id);
                None
            }
        });

        let value: Value = match serde_json::from_str(&request.body) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse request body: {}", e);
                let response = JsonRpcResponse::error(
                    Some(Value::Null),
                    JsonRpcError::parse_error().with_data(Value::String(e.to_string())),
                );
                return rpc_response(400, &response);
            }
        };

        let rpc_request = match decode_request(value) {
            Ok(rpc_request) => rpc_request,
            Err(response) => {
                return rpc_response(200, &response).with_header(PROTOCOL_VERSION_HEADER, negotiated);
            }
        };

        let ctx = RequestContext::new(&rpc_request)
            .with_session(session_id.clone())
            .with_cancellation(cancel);

        if is_notification(&rpc_request) {
            Dispatcher::new(&self.handler).dispatch(rpc_request, &ctx).await;
            return with_session(
                GatewayResponse::empty(202).with_header(PROTOCOL_VERSION_HEADER, negotiated),
                session_id.as_deref(),
            );
        }

        let is_initialize = rpc_request.method == "initialize";
        let response = Dispatcher::new(&self.handler).dispatch(rpc_request, &ctx).await;

        let session_id = if is_initialize && response.is_success() {
            let session = self.state.sessions.create_session();
            info!("Session created: {}", session.id);
            Some(session.id)
        } else {
            session_id
        };

        with_session(
            rpc_response(200, &response).with_header(PROTOCOL_VERSION_HEADER, negotiated),
            session_id.as_deref(),
        )
    }

    fn status(&self) -> GatewayResponse {
        GatewayResponse::json(
            200,
            &json!({
                "status": "MCP Server is running",
                "name": self.state.config.name,
                "version": self.state.config.version,
                "protocolVersions": SUPPORTED_PROTOCOL_VERSIONS,
            }),
        )
    }

    fn well_known(&self, request: &GatewayRequest) -> GatewayResponse {
        let Some(resource_path) = well_known_resource_path(&request.path) else {
            debug!("Unknown well-known path: {}", request.path);
            return GatewayResponse::json(404, &error_body("not_found", "Unknown well-known resource"));
        };

        let metadata = self
            .state
            .auth
            .resource_metadata(request.host(), resource_path, &request.stage);
        match serde_json::to_value(&metadata) {
            Ok(body) => GatewayResponse::json(200, &body).with_header("Cache-Control", METADATA_CACHE_CONTROL),
            Err(e) => GatewayResponse::json(500, &error_body("internal_error", e.to_string())),
        }
    }
}

fn preflight() -> GatewayResponse {
    GatewayResponse::empty(204)
        .with_header("Access-Control-Allow-Methods", ALLOWED_METHODS)
        .with_header("Access-Control-Allow-Headers", ALLOWED_HEADERS)
        .with_header("Access-Control-Expose-Headers", EXPOSED_HEADERS)
        .with_header("Access-Control-Max-Age", "86400")
}

fn with_session(response: GatewayResponse, session_id: Option<&str>) -> GatewayResponse {
    match session_id {
        Some(id) => response.with_header(SESSION_ID_HEADER, id),
        None => response,
    }
}

fn rpc_response(status: u16, response: &JsonRpcResponse) -> GatewayResponse {
    match serde_json::to_value(response) {
        Ok(body) => GatewayResponse::json(status, &body),
        Err(e) => GatewayResponse::json(500, &error_body("internal_error", e.to_string())),
    }
}

/// Turn a parsed body into a request, or into the `-32600` reply for it.
fn decode_request(value: Value) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let id = value.get("id").cloned();

    let Some(object) = value.as_object() else {
        return Err(JsonRpcResponse::error(
            Some(Value::Null),
            JsonRpcError::invalid_request("Request must be a JSON object"),
        ));
    };
    if !object.get("method").is_some_and(Value::is_string) {
        return Err(JsonRpcResponse::error(
            Some(id.unwrap_or(Value::Null)),
            JsonRpcError::invalid_request("Request method must be a string"),
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        JsonRpcResponse::error(
            Some(id.unwrap_or(Value::Null)),
            JsonRpcError::invalid_request(e.to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_resource_path() {
        assert_eq!(
            well_known_resource_path("/.well-known/oauth-protected-resource"),
            Some("/")
        );
        assert_eq!(
            well_known_resource_path("/.well-known/oauth-protected-resource/mcp"),
            Some("/mcp")
        );
        assert_eq!(
            well_known_resource_path("/dev/.well-known/oauth-protected-resource"),
            Some("/")
        );
        assert_eq!(well_known_resource_path("/.well-known/openid-configuration"), None);
        assert_eq!(well_known_resource_path("/.well-known/oauth-protected-resourcex"), None);
    }

    #[test]
    fn test_decode_request_shapes() {
        let err = decode_request(json!([1, 2])).unwrap_err();
        assert_eq!(err.error.unwrap().code, -32600);
        assert_eq!(err.id, Some(Value::Null));

        let err = decode_request(json!({"id": 4})).unwrap_err();
        assert_eq!(err.id, Some(json!(4)));

        let err = decode_request(json!({"id": "x", "method": 12})).unwrap_err();
        assert_eq!(err.id, Some(json!("x")));

        let ok = decode_request(json!({"jsonrpc": "2.0", "method": "ping"})).unwrap();
        assert!(ok.id.is_none());
    }

    #[test]
    fn test_notification_detection() {
        assert!(is_notification(&JsonRpcRequest::new("notifications/initialized")));
        assert!(!is_notification(&JsonRpcRequest::new("tools/list")));
        assert!(!is_notification(
            &JsonRpcRequest::new("notifications/initialized").with_id(1)
        ));
    }
}
