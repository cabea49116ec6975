//! MCP tool server behind an API-gateway style admission pipeline.
//!
//! Requests pass protocol-version negotiation, bearer authentication and
//! session resolution before being dispatched as JSON-RPC to the tool
//! registry. The same pipeline serves a stdio loop, an HTTP listener and a
//! serverless event loop.
//!
//! # Example
//!
//! ```no_run
//! use mcp_lambda_gateway::{
//!     config::ServerConfig,
//!     gateway::{Gateway, GatewayRequest},
//!     server::ServerState,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::builder().from_env()?.build()?;
//!     let state = Arc::new(ServerState::builder().config(config).build()?);
//!     let gateway = Gateway::new(state);
//!
//!     let request = GatewayRequest::new("POST", "/mcp")
//!         .with_body(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#);
//!     let response = gateway.handle(request, CancellationToken::new()).await;
//!     println!("{} {}", response.status, response.body);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;

pub use auth::{AuthGate, StaticTokenValidator, TokenClaims, TokenValidator};
pub use config::{AuthConfig, RunMode, ServerConfig, ServerConfigBuilder, SessionConfig};
pub use error::{McpError, Result};
pub use gateway::{Gateway, GatewayRequest, GatewayResponse};
pub use protocol::McpServer;
pub use server::{McpHandler, ServerState, ServerStateBuilder};
pub use session::{Session, SessionStore};
pub use tools::{ToolRegistry, create_registry};
