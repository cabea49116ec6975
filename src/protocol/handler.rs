//! Request handler and method dispatcher.

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::types::*;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Handler trait for processing MCP requests.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle initialize request.
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult>;

    /// Handle initialized notification.
    async fn initialized(&self) -> ProtocolResult<()> {
        Ok(())
    }

    /// List available tools.
    async fn list_tools(&self) -> ProtocolResult<ListToolsResult>;

    /// Call a tool.
    async fn call_tool(
        &self,
        params: CallToolParams,
        ctx: &RequestContext,
    ) -> ProtocolResult<CallToolResult>;

    /// List static resources.
    async fn list_resources(&self) -> ProtocolResult<ListResourcesResult> {
        Ok(ListResourcesResult { resources: vec![] })
    }

    /// List prompt templates.
    async fn list_prompts(&self) -> ProtocolResult<ListPromptsResult> {
        Ok(ListPromptsResult { prompts: vec![] })
    }

    /// Handle ping request.
    async fn ping(&self) -> ProtocolResult<Value> {
        Ok(serde_json::json!({}))
    }
}

/// Method dispatcher that routes requests to appropriate handlers.
pub struct Dispatcher<'h, H: Handler + ?Sized> {
    handler: &'h H,
}

impl<'h, H: Handler + ?Sized> Dispatcher<'h, H> {
    pub fn new(handler: &'h H) -> Self {
        Self { handler }
    }

    /// Dispatch a request to the appropriate handler method.
    ///
    /// The request id is echoed untouched on success and on error.
    #[instrument(skip(self, request, ctx), fields(method = %request.method))]
    pub async fn dispatch(&self, request: JsonRpcRequest, ctx: &RequestContext) -> JsonRpcResponse {
        debug!("Dispatching request: {}", request.method);

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "initialized" | "notifications/initialized" => self.handle_initialized().await,
            "ping" => self.handler.ping().await,
            "tools/list" => to_value(self.handler.list_tools().await),
            "tools/call" => self.handle_call_tool(request.params, ctx).await,
            "resources/list" => to_value(self.handler.list_resources().await),
            "prompts/list" => to_value(self.handler.list_prompts().await),
            method => {
                warn!("Unknown method: {}", method);
                Err(ProtocolError::MethodNotFound(method.to_string()))
            }
        };

        match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => {
                debug!("Request failed: {}", e);
                JsonRpcResponse::error(request.id, JsonRpcError::new(e.code(), e.to_string()))
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> ProtocolResult<Value> {
        let params: InitializeParams = parse_params(params)?.unwrap_or_default();
        to_value(self.handler.initialize(params).await)
    }

    async fn handle_initialized(&self) -> ProtocolResult<Value> {
        self.handler.initialized().await?;
        Ok(Value::Null)
    }

    async fn handle_call_tool(
        &self,
        params: Option<Value>,
        ctx: &RequestContext,
    ) -> ProtocolResult<Value> {
        let params: CallToolParams = parse_params(params)?
            .ok_or_else(|| ProtocolError::InvalidParams("Missing params".into()))?;

        to_value(self.handler.call_tool(params, ctx).await)
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> ProtocolResult<Option<T>> {
    params
        .filter(|p| !p.is_null())
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| ProtocolError::InvalidParams(e.to_string().into()))
}

fn to_value<T: serde::Serialize>(result: ProtocolResult<T>) -> ProtocolResult<Value> {
    serde_json::to_value(result?).map_err(|e| ProtocolError::InternalError(e.to_string().into()))
}

/// Per-request context handed down to handler methods.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: Option<RequestId>,
    pub method: String,
    pub session_id: Option<String>,
    pub cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(request: &JsonRpcRequest) -> Self {
        Self {
            request_id: request.id.clone(),
            method: request.method.clone(),
            session_id: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}
