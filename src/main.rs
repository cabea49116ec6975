//! MCP gateway binary entry point.

use anyhow::{Context, Result};
use clap::Parser;
use mcp_lambda_gateway::{
    config::{RunMode, ServerConfig, ServerConfigBuilder, parse_listen_addr, parse_scopes},
    gateway::{self, Gateway},
    protocol::McpServer,
    server::{McpHandler, ServerState},
    session::spawn_sweeper,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Command-line overrides. The environment is read by `ServerConfigBuilder::from_vars`;
/// a flag only wins when it is passed explicitly.
#[derive(Debug, Parser)]
#[command(name = "mcp-lambda-gateway", version, about)]
struct Args {
    /// Require a bearer token on every MCP request
    #[arg(long)]
    require_auth: bool,

    /// OAuth authorization server advertised in resource metadata
    #[arg(long)]
    auth_server: Option<String>,

    /// Comma separated scopes accepted by this server
    #[arg(long)]
    allowed_scopes: Option<String>,

    /// Scope hinted in authentication challenges
    #[arg(long)]
    default_scope: Option<String>,

    /// HTTP listen address, e.g. `localhost:8080` or a bare port
    #[arg(long)]
    http: Option<String>,

    /// Run mode: stdio, http or serverless
    #[arg(long)]
    mode: Option<String>,
}

impl Args {
    fn apply(self, mut builder: ServerConfigBuilder) -> Result<ServerConfigBuilder> {
        if self.require_auth {
            builder = builder.require_auth(true);
        }
        if let Some(url) = self.auth_server {
            builder = builder.authorization_server(url);
        }
        if let Some(scopes) = self.allowed_scopes {
            builder = builder.allowed_scopes(parse_scopes(&scopes));
        }
        if let Some(scope) = self.default_scope {
            builder = builder.default_scope(scope);
        }
        if let Some(addr) = self.http {
            builder = builder.http_addr(parse_listen_addr(&addr)?);
        }
        if let Some(mode) = self.mode {
            builder = builder.run_mode(RunMode::try_from(mode.as_str())?);
        }
        Ok(builder)
    }
}

/// Environment first, then explicit flags on top.
fn resolve_config<F>(args: Args, var: F) -> Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    args.apply(ServerConfig::builder().from_vars(var)?)?
        .build()
        .context("invalid configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = resolve_config(args, |key| std::env::var(key).ok())?;
    let mode = config.effective_run_mode();

    let state = Arc::new(ServerState::builder().config(config).build()?);
    info!(
        mode = ?mode,
        require_auth = state.auth.require_auth(),
        "Server state initialized with {} tools",
        state.tools.len()
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {}", e);
                return;
            }
            info!("Shutdown signal received");
            shutdown.cancel();
        });
    }

    let sweeper = spawn_sweeper(
        Arc::clone(&state.sessions),
        state.config.session.sweep_interval,
        state.config.session.idle_timeout,
        shutdown.child_token(),
    );

    match mode {
        RunMode::Stdio => {
            let handler = Arc::new(McpHandler::new(Arc::clone(&state)));
            let server = McpServer::new(handler, state.config.name.to_string());
            tokio::select! {
                result = server.run() => result?,
                _ = shutdown.cancelled() => server.stop(),
            }
        }
        RunMode::Http => {
            let addr = state
                .config
                .http_addr
                .context("http mode needs a listen address")?;
            let gateway = Arc::new(Gateway::new(Arc::clone(&state)));
            gateway::http::serve(addr, gateway, shutdown.clone()).await?;
        }
        RunMode::Serverless => {
            let gateway = Gateway::new(Arc::clone(&state));
            gateway::serverless::run_stdio(&gateway, shutdown.clone()).await?;
        }
    }

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        error!("Session sweeper failed: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mcp_lambda_gateway=info,warn"));

    // JSON to stderr; stdout carries the stdio and serverless protocol streams
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::SocketAddr;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn resolve(argv: &[&str], env: &[(&str, &str)]) -> ServerConfig {
        let args = Args::try_parse_from(argv).unwrap();
        resolve_config(args, vars(env)).unwrap()
    }

    #[test]
    fn test_port_beats_http_addr_env() {
        let config = resolve(
            &["mcp-lambda-gateway"],
            &[("PORT", "18081"), ("MCP_HTTP_ADDR", "127.0.0.1:18082")],
        );
        assert_eq!(
            config.http_addr,
            Some("0.0.0.0:18081".parse::<SocketAddr>().unwrap())
        );
        assert_eq!(config.effective_run_mode(), RunMode::Http);
    }

    #[test]
    fn test_explicit_flag_beats_environment() {
        let config = resolve(
            &["mcp-lambda-gateway", "--http", "127.0.0.1:9000"],
            &[("PORT", "18081")],
        );
        assert_eq!(
            config.http_addr,
            Some("127.0.0.1:9000".parse::<SocketAddr>().unwrap())
        );
    }

    #[test]
    fn test_require_auth_env_accepts_loose_booleans() {
        for value in ["1", "yes", "on", "true"] {
            let config = resolve(&["mcp-lambda-gateway"], &[("MCP_REQUIRE_AUTH", value)]);
            assert!(config.auth.require_auth, "value {value}");
        }

        let config = resolve(&["mcp-lambda-gateway"], &[("MCP_REQUIRE_AUTH", "0")]);
        assert!(!config.auth.require_auth);

        let config = resolve(&["mcp-lambda-gateway", "--require-auth"], &[]);
        assert!(config.auth.require_auth);
    }

    #[test]
    fn test_environment_alone_configures_auth() {
        let config = resolve(
            &["mcp-lambda-gateway"],
            &[
                ("MCP_AUTH_SERVER", "https://login.example.org"),
                ("MCP_ALLOWED_SCOPES", "a, b"),
                ("MCP_DEFAULT_SCOPE", "a"),
            ],
        );
        assert_eq!(
            config.auth.authorization_server.as_deref(),
            Some("https://login.example.org")
        );
        assert_eq!(config.auth.allowed_scopes, vec!["a", "b"]);
        assert_eq!(config.auth.default_scope, "a");
    }
}
