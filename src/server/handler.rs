//! MCP request handler implementation.

use crate::error::ProtocolResult;
use crate::protocol::{
    CallToolParams, CallToolResult, Handler, Implementation, InitializeParams, InitializeResult,
    ListChangedCapability, ListPromptsResult, ListResourcesResult, ListToolsResult, Prompt,
    PromptArgument, RequestContext, Resource, ServerCapabilities, version,
};
use crate::server::state::ServerState;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// MCP request handler that processes protocol messages.
pub struct McpHandler {
    state: Arc<ServerState>,
}

impl McpHandler {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    fn instructions(&self) -> String {
        let names: Vec<String> = self.state.tools.list().into_iter().map(|t| t.name).collect();
        format!(
            "MCP gateway exposing simple calculator, text and greeting tools. \
            Available tools: {}. Call 'help' for a grouped overview.",
            names.join(", ")
        )
    }
}

fn resource(uri: &str, name: &str, description: &str, mime_type: &str) -> Resource {
    Resource {
        uri: uri.into(),
        name: name.into(),
        description: Some(description.into()),
        mime_type: Some(mime_type.into()),
    }
}

fn prompt(name: &str, description: &str, arguments: &[(&str, &str, bool)]) -> Prompt {
    Prompt {
        name: name.into(),
        description: Some(description.into()),
        arguments: Some(
            arguments
                .iter()
                .map(|&(name, description, required)| PromptArgument {
                    name: name.into(),
                    description: Some(description.into()),
                    required: Some(required),
                })
                .collect(),
        ),
    }
}

/// Static resource catalog advertised by `resources/list`.
pub fn resource_catalog() -> Vec<Resource> {
    vec![
        resource(
            "file:///project/README.md",
            "Project README",
            "Project overview document",
            "text/markdown",
        ),
        resource(
            "https://api.example.com/status",
            "API status",
            "Service health endpoint",
            "application/json",
        ),
        resource(
            "file:///logs/app.log",
            "Application log",
            "Recent application log file",
            "text/plain",
        ),
    ]
}

/// Static prompt templates advertised by `prompts/list`.
pub fn prompt_catalog() -> Vec<Prompt> {
    vec![
        prompt(
            "code-review",
            "Review a piece of code",
            &[
                ("language", "programming language", true),
                ("code", "code to review", true),
            ],
        ),
        prompt(
            "bug-analysis",
            "Analyze a bug from its error message",
            &[
                ("error_message", "the error message", true),
                ("context", "where the error happened", false),
            ],
        ),
        prompt(
            "documentation",
            "Write documentation for a function",
            &[("function_name", "function to document", true)],
        ),
    ]
}

#[async_trait]
impl Handler for McpHandler {
    async fn initialize(&self, params: InitializeParams) -> ProtocolResult<InitializeResult> {
        match &params.client_info {
            Some(client) => info!("Initialize request from {} v{}", client.name, client.version),
            None => info!("Initialize request from anonymous client"),
        }
        debug!("Client capabilities: {:?}", params.capabilities);

        let protocol_version = version::for_initialize(params.protocol_version.as_deref());

        let listed = || {
            Some(ListChangedCapability {
                list_changed: Some(false),
            })
        };

        Ok(InitializeResult {
            protocol_version: protocol_version.into(),
            capabilities: ServerCapabilities {
                tools: listed(),
                resources: listed(),
                prompts: listed(),
            },
            server_info: Implementation {
                name: self.state.config.name.to_string(),
                version: self.state.config.version.to_string(),
            },
            instructions: Some(self.instructions()),
        })
    }

    async fn initialized(&self) -> ProtocolResult<()> {
        info!("Client reported initialization complete");
        Ok(())
    }

    async fn list_tools(&self) -> ProtocolResult<ListToolsResult> {
        let tools = self.state.tools.list();
        debug!("Listing {} tools", tools.len());

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        params: CallToolParams,
        ctx: &RequestContext,
    ) -> ProtocolResult<CallToolResult> {
        debug!("Tool call: {}", params.name);
        Ok(self.state.tools.dispatch(params, ctx).await)
    }

    async fn list_resources(&self) -> ProtocolResult<ListResourcesResult> {
        Ok(ListResourcesResult {
            resources: resource_catalog(),
        })
    }

    async fn list_prompts(&self) -> ProtocolResult<ListPromptsResult> {
        Ok(ListPromptsResult {
            prompts: prompt_catalog(),
        })
    }
}
