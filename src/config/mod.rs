//! Configuration types and builders.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_SCOPE: &str = "mcp:tools";

/// How the process receives requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Stdio,
    Http,
    Serverless,
}

impl RunMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "stdio" => Some(Self::Stdio),
            "http" => Some(Self::Http),
            "serverless" | "lambda" => Some(Self::Serverless),
            _ => None,
        }
    }
}

impl TryFrom<&str> for RunMode {
    type Error = ConfigError;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        Self::parse(s).ok_or_else(|| ConfigError::InvalidValue {
            field: "run_mode".into(),
            message: format!("Unknown run mode: '{}'. Valid modes: stdio, http, serverless", s).into(),
        })
    }
}

/// Bearer authentication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub require_auth: bool,
    pub authorization_server: Option<String>,
    pub allowed_scopes: Vec<String>,
    pub default_scope: String,
    /// Sentinel accepted by the development validator.
    #[serde(skip_serializing)]
    pub static_token: String,
    #[serde(skip_serializing)]
    pub token_prefix: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_auth: false,
            authorization_server: None,
            allowed_scopes: vec![DEFAULT_SCOPE.into()],
            default_scope: DEFAULT_SCOPE.into(),
            static_token: "test-token".into(),
            token_prefix: "Bearer-".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub idle_timeout: Duration,
    pub max_sessions: usize,
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(3600),
            max_sessions: 10_000,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: Cow<'static, str>,
    pub version: Cow<'static, str>,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub http_addr: Option<SocketAddr>,
    /// Explicitly requested mode. When unset the mode is inferred.
    pub run_mode: Option<RunMode>,
    /// Set when the process runs inside a serverless function environment.
    pub serverless_env: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "mcp-lambda-gateway".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            auth: AuthConfig::default(),
            session: SessionConfig::default(),
            http_addr: None,
            run_mode: None,
            serverless_env: false,
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Explicit mode, then serverless environment, then HTTP if an address is set, else stdio.
    pub fn effective_run_mode(&self) -> RunMode {
        if let Some(mode) = self.run_mode {
            return mode;
        }
        if self.serverless_env {
            return RunMode::Serverless;
        }
        if self.http_addr.is_some() {
            return RunMode::Http;
        }
        RunMode::Stdio
    }
}

/// Parse a listen address. A bare port (`8080` or `:8080`) binds all interfaces.
pub fn parse_listen_addr(s: &str) -> std::result::Result<SocketAddr, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidAddress(s.to_string());

    if s.is_empty() {
        return Err(invalid());
    }

    let port_only = s.strip_prefix(':').unwrap_or(s);
    if port_only.chars().all(|c| c.is_ascii_digit()) {
        let port: u16 = port_only.parse().map_err(|_| invalid())?;
        return Ok(SocketAddr::from(([0, 0, 0, 0], port)));
    }

    if let Some(port) = s.strip_prefix("localhost:") {
        let port: u16 = port.parse().map_err(|_| invalid())?;
        return Ok(SocketAddr::from(([127, 0, 0, 1], port)));
    }

    s.parse().map_err(|_| invalid())
}

fn parse_bool(field: &'static str, value: &str) -> std::result::Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field: field.into(),
            message: format!("Expected a boolean, got '{}'", other).into(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
) -> std::result::Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.into(),
        message: format!("Invalid number: '{}'", value).into(),
    })
}

/// Split a comma separated list, dropping blanks.
pub fn parse_scopes(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Builder for ServerConfig.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.config.version = version.into();
        self
    }

    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.config.auth = auth;
        self
    }

    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    pub fn require_auth(mut self, require_auth: bool) -> Self {
        self.config.auth.require_auth = require_auth;
        self
    }

    pub fn authorization_server(mut self, url: impl Into<String>) -> Self {
        self.config.auth.authorization_server = Some(url.into());
        self
    }

    pub fn allowed_scopes(mut self, scopes: Vec<String>) -> Self {
        self.config.auth.allowed_scopes = scopes;
        self
    }

    pub fn default_scope(mut self, scope: impl Into<String>) -> Self {
        self.config.auth.default_scope = scope.into();
        self
    }

    pub fn http_addr(mut self, addr: SocketAddr) -> Self {
        self.config.http_addr = Some(addr);
        self
    }

    pub fn run_mode(mut self, mode: RunMode) -> Self {
        self.config.run_mode = Some(mode);
        self
    }

    /// Build from environment variables.
    pub fn from_env(self) -> Result<Self> {
        self.from_vars(|key| env::var(key).ok())
    }

    /// Apply settings from any key/value source shaped like the process environment.
    pub fn from_vars<F>(mut self, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = var("MCP_REQUIRE_AUTH") {
            self.config.auth.require_auth = parse_bool("MCP_REQUIRE_AUTH", &value)?;
        }

        if let Some(url) = var("MCP_AUTH_SERVER").filter(|v| !v.trim().is_empty()) {
            self.config.auth.authorization_server = Some(url.trim().to_string());
        }

        if let Some(scopes) = var("MCP_ALLOWED_SCOPES") {
            self.config.auth.allowed_scopes = parse_scopes(&scopes);
        }

        if let Some(scope) = var("MCP_DEFAULT_SCOPE") {
            self.config.auth.default_scope = scope.trim().to_string();
        }

        if let Some(token) = var("MCP_STATIC_TOKEN") {
            self.config.auth.static_token = token;
        }

        if let Some(prefix) = var("MCP_TOKEN_PREFIX") {
            self.config.auth.token_prefix = prefix;
        }

        if let Some(secs) = var("MCP_SESSION_IDLE_SECS") {
            let secs: u64 = parse_number("MCP_SESSION_IDLE_SECS", &secs)?;
            self.config.session.idle_timeout = Duration::from_secs(secs);
        }

        if let Some(max) = var("MCP_MAX_SESSIONS") {
            self.config.session.max_sessions = parse_number("MCP_MAX_SESSIONS", &max)?;
        }

        // PORT wins over MCP_HTTP_ADDR, matching common PaaS conventions
        let addr = var("PORT")
            .filter(|v| !v.trim().is_empty())
            .or_else(|| var("MCP_HTTP_ADDR").filter(|v| !v.trim().is_empty()));
        if let Some(addr) = addr {
            self.config.http_addr = Some(parse_listen_addr(&addr)?);
        }

        if let Some(mode) = var("MCP_RUN_MODE").filter(|v| !v.trim().is_empty()) {
            self.config.run_mode = Some(RunMode::try_from(mode.as_str())?);
        }

        self.config.serverless_env = var("AWS_LAMBDA_FUNCTION_NAME").is_some_and(|v| !v.is_empty());

        Ok(self)
    }

    pub fn build(self) -> Result<ServerConfig> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<()> {
        if self.config.name.is_empty() {
            return Err(ConfigError::MissingField("name".into()).into());
        }
        if self.config.session.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_sessions".into(),
                message: "Session capacity must be greater than 0".into(),
            }
            .into());
        }
        if self.config.session.idle_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "idle_timeout".into(),
                message: "Idle timeout must be greater than 0".into(),
            }
            .into());
        }
        if self.config.session.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "sweep_interval".into(),
                message: "Sweep interval must be greater than 0".into(),
            }
            .into());
        }
        if self.config.effective_run_mode() == RunMode::Http && self.config.http_addr.is_none() {
            return Err(ConfigError::MissingField("http_addr".into()).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::McpError;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_run_mode_parse() {
        assert_eq!(RunMode::parse("HTTP"), Some(RunMode::Http));
        assert_eq!(RunMode::parse("lambda"), Some(RunMode::Serverless));
        assert_eq!(RunMode::parse("stdio"), Some(RunMode::Stdio));
        assert!(RunMode::try_from("carrier-pigeon").is_err());
    }

    #[test]
    fn test_parse_listen_addr() {
        assert_eq!(parse_listen_addr("8080").unwrap(), "0.0.0.0:8080".parse().unwrap());
        assert_eq!(parse_listen_addr(":9000").unwrap(), "0.0.0.0:9000".parse().unwrap());
        assert_eq!(
            parse_listen_addr("localhost:3000").unwrap(),
            "127.0.0.1:3000".parse().unwrap()
        );
        assert_eq!(
            parse_listen_addr("10.0.0.1:80").unwrap(),
            "10.0.0.1:80".parse().unwrap()
        );
        assert!(matches!(
            parse_listen_addr("99999"),
            Err(ConfigError::InvalidAddress(_))
        ));
        assert!(parse_listen_addr("").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::builder().build().unwrap();
        assert!(!config.auth.require_auth);
        assert_eq!(config.auth.allowed_scopes, [DEFAULT_SCOPE]);
        assert_eq!(config.session.idle_timeout, Duration::from_secs(3600));
        assert_eq!(config.effective_run_mode(), RunMode::Stdio);
    }

    #[test]
    fn test_from_vars() {
        let config = ServerConfig::builder()
            .from_vars(vars(&[
                ("MCP_REQUIRE_AUTH", "true"),
                ("MCP_AUTH_SERVER", "https://login.example.org"),
                ("MCP_ALLOWED_SCOPES", "mcp:tools, mcp:admin,,"),
                ("MCP_SESSION_IDLE_SECS", "120"),
                ("PORT", "8080"),
            ]))
            .unwrap()
            .build()
            .unwrap();

        assert!(config.auth.require_auth);
        assert_eq!(
            config.auth.authorization_server.as_deref(),
            Some("https://login.example.org")
        );
        assert_eq!(config.auth.allowed_scopes, ["mcp:tools", "mcp:admin"]);
        assert_eq!(config.session.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.effective_run_mode(), RunMode::Http);
    }

    #[test]
    fn test_run_mode_resolution_order() {
        let config = ServerConfig::builder()
            .from_vars(vars(&[("AWS_LAMBDA_FUNCTION_NAME", "fn"), ("PORT", "80")]))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.effective_run_mode(), RunMode::Serverless);

        let config = ServerConfig::builder()
            .from_vars(vars(&[("AWS_LAMBDA_FUNCTION_NAME", "fn"), ("MCP_RUN_MODE", "stdio")]))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.effective_run_mode(), RunMode::Stdio);
    }

    #[test]
    fn test_invalid_values() {
        let err = ServerConfig::builder()
            .from_vars(vars(&[("MCP_REQUIRE_AUTH", "maybe")]))
            .err()
            .unwrap();
        assert!(matches!(err, McpError::Config(ConfigError::InvalidValue { .. })));

        let err = ServerConfig::builder()
            .run_mode(RunMode::Http)
            .build()
            .unwrap_err();
        assert!(matches!(err, McpError::Config(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let err = ServerConfig::builder()
            .session(SessionConfig {
                sweep_interval: Duration::ZERO,
                ..SessionConfig::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            McpError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "sweep_interval"
        ));
    }
}
