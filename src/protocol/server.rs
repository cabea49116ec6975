//! Stdio MCP server with lifecycle tracking.

use crate::error::{McpError, ProtocolError, Result};
use crate::protocol::handler::{Dispatcher, Handler, RequestContext};
use crate::protocol::transport::{StdioTransport, Transport};
use crate::protocol::types::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Server created but not initialized.
    Created,
    /// Initialize request received, awaiting initialized notification.
    Initializing,
    /// Server is fully operational.
    Running,
    /// Server has stopped.
    Stopped,
}

/// Stdio MCP server. Local pipes carry no headers, so auth and sessions are skipped.
pub struct McpServer<H: Handler> {
    name: String,
    handler: Arc<H>,
    lifecycle: RwLock<Lifecycle>,
    running: AtomicBool,
    shutdown: CancellationToken,
}

impl<H: Handler> McpServer<H> {
    pub fn new(handler: Arc<H>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler,
            lifecycle: RwLock::new(Lifecycle::Created),
            running: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read().await
    }

    /// Run the server on stdin/stdout.
    #[instrument(skip(self), fields(server = %self.name))]
    pub async fn run(&self) -> Result<()> {
        let transport = StdioTransport::new();
        self.run_with_transport(&transport).await
    }

    /// Run the server with a custom transport until EOF or [`McpServer::stop`].
    pub async fn run_with_transport<T: Transport>(&self, transport: &T) -> Result<()> {
        info!("Starting stdio MCP server: {}", self.name);
        self.running.store(true, Ordering::SeqCst);

        let dispatcher = Dispatcher::new(self.handler.as_ref());

        while self.running.load(Ordering::SeqCst) {
            let message = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                message = transport.read_message() => message,
            };

            let message = match message {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    debug!("EOF received, shutting down");
                    break;
                }
                Err(McpError::Protocol(ProtocolError::ParseError)) => {
                    let response =
                        JsonRpcResponse::error(Some(serde_json::Value::Null), JsonRpcError::parse_error());
                    if let Err(e) = transport.write_response(&response).await {
                        error!("Failed to send error response: {}", e);
                    }
                    continue;
                }
                Err(e) => {
                    error!("Transport error: {}", e);
                    break;
                }
            };

            match message {
                Message::Request(request) => {
                    let is_notification = request.is_notification();
                    self.advance_lifecycle(&request.method).await;

                    let ctx = RequestContext::new(&request)
                        .with_cancellation(self.shutdown.child_token());
                    let response = dispatcher.dispatch(request, &ctx).await;

                    if !is_notification && let Err(e) = transport.write_response(&response).await {
                        error!("Failed to send response: {}", e);
                    }
                }
                Message::Response(response) => {
                    warn!("Unexpected response received: {:?}", response.id);
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        *self.lifecycle.write().await = Lifecycle::Stopped;
        info!("Server stopped");
        Ok(())
    }

    async fn advance_lifecycle(&self, method: &str) {
        let mut lifecycle = self.lifecycle.write().await;
        match method {
            "initialize" if *lifecycle == Lifecycle::Created => {
                *lifecycle = Lifecycle::Initializing;
            }
            "initialized" | "notifications/initialized" if *lifecycle == Lifecycle::Initializing => {
                *lifecycle = Lifecycle::Running;
                info!("Client initialized, server running");
            }
            _ => {}
        }
    }

    /// Stop the server and cancel in-flight tool calls.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolResult;
    use crate::protocol::version::CURRENT_PROTOCOL_VERSION;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    struct TestHandler;

    #[async_trait]
    impl Handler for TestHandler {
        async fn initialize(&self, _params: InitializeParams) -> ProtocolResult<InitializeResult> {
            Ok(InitializeResult {
                protocol_version: CURRENT_PROTOCOL_VERSION.into(),
                capabilities: ServerCapabilities::default(),
                server_info: Implementation {
                    name: "test".into(),
                    version: "1.0".into(),
                },
                instructions: None,
            })
        }

        async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
            Ok(ListToolsResult {
                tools: vec![],
                next_cursor: None,
            })
        }

        async fn call_tool(
            &self,
            _params: CallToolParams,
            _ctx: &RequestContext,
        ) -> ProtocolResult<CallToolResult> {
            Ok(CallToolResult::text("test"))
        }
    }

    /// Scripted transport: replays queued reads and records writes.
    struct ScriptedTransport {
        incoming: Mutex<VecDeque<Result<Option<Message>>>>,
        written: Mutex<Vec<JsonRpcResponse>>,
    }

    impl ScriptedTransport {
        fn new(incoming: Vec<Result<Option<Message>>>) -> Self {
            Self {
                incoming: Mutex::new(incoming.into()),
                written: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn read_message(&self) -> Result<Option<Message>> {
            self.incoming.lock().pop_front().unwrap_or(Ok(None))
        }

        async fn write_response(&self, response: &JsonRpcResponse) -> Result<()> {
            self.written.lock().push(response.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_server_lifecycle() {
        let server = McpServer::new(Arc::new(TestHandler), "test-server");
        assert_eq!(server.lifecycle().await, Lifecycle::Created);

        let transport = ScriptedTransport::new(vec![
            Ok(Some(Message::Request(
                JsonRpcRequest::new("initialize").with_id(1),
            ))),
            Ok(Some(Message::Request(JsonRpcRequest::new(
                "notifications/initialized",
            )))),
            Ok(Some(Message::Request(
                JsonRpcRequest::new("tools/list").with_id(2),
            ))),
        ]);

        server.run_with_transport(&transport).await.unwrap();

        let written = transport.written.lock();
        // The notification gets no response.
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].id, Some(serde_json::json!(1)));
        assert_eq!(written[1].id, Some(serde_json::json!(2)));
        drop(written);
        assert_eq!(server.lifecycle().await, Lifecycle::Stopped);
    }

    #[tokio::test]
    async fn test_parse_error_keeps_loop_alive() {
        let server = McpServer::new(Arc::new(TestHandler), "test-server");
        let transport = ScriptedTransport::new(vec![
            Err(McpError::Protocol(ProtocolError::ParseError)),
            Ok(Some(Message::Request(JsonRpcRequest::new("ping").with_id(9)))),
        ]);

        server.run_with_transport(&transport).await.unwrap();

        let written = transport.written.lock();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].error.as_ref().unwrap().code, -32700);
        assert_eq!(written[0].id, Some(serde_json::Value::Null));
        assert!(written[1].is_success());
    }
}
