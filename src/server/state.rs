//! Server state management.

use crate::auth::{AuthGate, TokenValidator};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::session::SessionStore;
use crate::tools::ToolRegistry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Everything a request needs, built once at startup and shared read-only.
pub struct ServerState {
    pub config: ServerConfig,
    pub tools: ToolRegistry,
    pub sessions: Arc<SessionStore>,
    pub auth: AuthGate,
    request_counter: AtomicU64,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        tools: ToolRegistry,
        sessions: Arc<SessionStore>,
        auth: AuthGate,
    ) -> Self {
        Self {
            config,
            tools,
            sessions,
            auth,
            request_counter: AtomicU64::new(0),
        }
    }

    pub fn builder() -> ServerStateBuilder {
        ServerStateBuilder::new()
    }

    /// Sequence number for log correlation.
    pub fn next_request_id(&self) -> u64 {
        self.request_counter.fetch_add(1, Ordering::Relaxed)
    }
}

pub struct ServerStateBuilder {
    config: Option<ServerConfig>,
    tools: Option<ToolRegistry>,
    sessions: Option<Arc<SessionStore>>,
    validator: Option<Arc<dyn TokenValidator>>,
}

impl ServerStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            tools: None,
            sessions: None,
            validator: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Replace the development token validator.
    pub fn token_validator(mut self, validator: Arc<dyn TokenValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn build(self) -> Result<ServerState> {
        let config = self.config.unwrap_or_default();

        let tools = match self.tools {
            Some(tools) => tools,
            None => crate::tools::create_registry()?,
        };

        let sessions = self
            .sessions
            .unwrap_or_else(|| Arc::new(SessionStore::new(config.session.max_sessions)));

        let auth = match self.validator {
            Some(validator) => AuthGate::with_validator(config.auth.clone(), validator),
            None => AuthGate::new(config.auth.clone()),
        };

        Ok(ServerState::new(config, tools, sessions, auth))
    }
}

impl Default for ServerStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
