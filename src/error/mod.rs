//! Error types for the gateway.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.

use std::borrow::Cow;
use thiserror::Error;

/// Main error type for the gateway.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON-RPC 2.0 and MCP protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error: invalid JSON")]
    ParseError,

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(Cow<'static, str>),

    #[error("Internal error: {0}")]
    InternalError(Cow<'static, str>),
}

impl ProtocolError {
    /// Returns the JSON-RPC 2.0 error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::InternalError(_) => -32603,
        }
    }
}

/// Bearer-token authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authorization header is empty")]
    MissingHeader,

    #[error("invalid authorization header format")]
    MalformedHeader,

    #[error("authorization scheme is not Bearer")]
    UnsupportedScheme,

    #[error("token is empty")]
    EmptyToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("insufficient scope: {required}")]
    InsufficientScope { required: String },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),
}

/// Tool registration and execution errors.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool already registered: {0}")]
    DuplicateName(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Result type alias for McpError.
pub type Result<T> = std::result::Result<T, McpError>;

/// Result type alias for ProtocolError.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Result type alias for AuthError.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Result type alias for ToolError.
pub type ToolResult<T> = std::result::Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_codes() {
        assert_eq!(ProtocolError::ParseError.code(), -32700);
        assert_eq!(ProtocolError::MethodNotFound("test".into()).code(), -32601);
        assert_eq!(ProtocolError::InvalidParams("test".into()).code(), -32602);
        assert_eq!(ProtocolError::InternalError("test".into()).code(), -32603);
    }

    #[test]
    fn test_error_conversion() {
        let auth_error = AuthError::InvalidToken;
        let mcp_error: McpError = auth_error.into();
        assert!(matches!(mcp_error, McpError::Auth(_)));

        let tool_error = ToolError::DuplicateName("add".into());
        let mcp_error: McpError = tool_error.into();
        assert!(matches!(mcp_error, McpError::Tool(_)));
    }

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(
            AuthError::UnsupportedScheme.to_string(),
            "authorization scheme is not Bearer"
        );
        assert_eq!(
            AuthError::InsufficientScope {
                required: "mcp:tools".into()
            }
            .to_string(),
            "insufficient scope: mcp:tools"
        );
    }
}
