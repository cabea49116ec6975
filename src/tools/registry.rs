//! Tool registry: built once at startup, then frozen.

use crate::error::{ToolError, ToolResult};
use crate::protocol::{CallToolParams, CallToolResult, RequestContext, Tool};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> Tool;
    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput>;
}

/// What a tool hands back on success: display text plus structured metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl ToolOutput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Invocation context passed to every tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub cancellation: CancellationToken,
    pub session_id: Option<String>,
    /// Definitions of every registered tool, in registration order.
    pub catalog: Arc<[Tool]>,
}

impl ToolContext {
    pub fn detached(catalog: Arc<[Tool]>) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            session_id: None,
            catalog,
        }
    }
}

/// Decode tool arguments into a typed struct. A missing arguments object is read as `{}`.
pub fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> ToolResult<T> {
    let arguments = if arguments.is_null() {
        Value::Object(Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

struct Entry {
    definition: Tool,
    handler: Arc<dyn ToolHandler>,
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names must be unique.
    pub fn register<T: ToolHandler + 'static>(&mut self, tool: T) -> ToolResult<&mut Self> {
        let definition = tool.definition();
        let name = definition.name.clone();
        if self.index.contains_key(&name) {
            warn!("Rejecting duplicate tool registration: {}", name);
            return Err(ToolError::DuplicateName(name));
        }

        debug!("Registering tool: {}", name);
        self.index.insert(name, self.entries.len());
        self.entries.push(Entry {
            definition,
            handler: Arc::new(tool),
        });
        Ok(self)
    }

    pub fn build(self) -> ToolRegistry {
        let catalog: Arc<[Tool]> = self
            .entries
            .iter()
            .map(|e| e.definition.clone())
            .collect::<Vec<_>>()
            .into();

        ToolRegistry {
            entries: self.entries,
            index: self.index,
            catalog,
        }
    }
}

/// Immutable tool registry. Safe to share across requests without locking.
pub struct ToolRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    catalog: Arc<[Tool]>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.entries[i].handler))
    }

    /// Definitions in registration order.
    pub fn list(&self) -> Vec<Tool> {
        self.catalog.to_vec()
    }

    pub fn catalog(&self) -> Arc<[Tool]> {
        Arc::clone(&self.catalog)
    }

    /// Run a tool by exact name.
    ///
    /// Unknown tools and tool failures come back as error-flagged results, never as
    /// protocol errors.
    #[instrument(skip(self, params, ctx), fields(tool = %params.name))]
    pub async fn dispatch(&self, params: CallToolParams, ctx: &RequestContext) -> CallToolResult {
        let Some(tool) = self.get(&params.name) else {
            warn!("Tool not found: {}", params.name);
            return CallToolResult::error(ToolError::NotFound(params.name).to_string());
        };

        let tool_ctx = ToolContext {
            cancellation: ctx.cancellation.clone(),
            session_id: ctx.session_id.clone(),
            catalog: self.catalog(),
        };

        if tool_ctx.cancellation.is_cancelled() {
            return CallToolResult::error(ToolError::Cancelled.to_string());
        }

        match tool.execute(params.arguments, &tool_ctx).await {
            Ok(output) => CallToolResult::text(output.content).with_structured(output.metadata),
            Err(e) => {
                debug!("Tool returned error: {}", e);
                CallToolResult::error(e.to_string())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[macro_export]
macro_rules! define_tool {
    (
        name: $name:expr,
        description: $desc:expr,
        schema: $schema:tt
    ) => {
        $crate::protocol::Tool {
            name: $name.into(),
            description: Some($desc.into()),
            input_schema: serde_json::json!($schema),
        }
    };
}
