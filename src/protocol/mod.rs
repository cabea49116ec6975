//! MCP protocol implementation over JSON-RPC 2.0.

pub mod handler;
pub mod server;
pub mod transport;
pub mod types;
pub mod version;

pub use handler::{Dispatcher, Handler, RequestContext};
pub use server::{Lifecycle, McpServer};
pub use transport::{LineChannel, StdioTransport, Transport};
pub use types::*;
pub use version::{CURRENT_PROTOCOL_VERSION, FALLBACK_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};
