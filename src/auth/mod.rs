//! Bearer-token authentication gate.
//!
//! Challenge headers follow RFC 6750 and the protected resource metadata
//! follows RFC 9728. Token verification itself is pluggable through
//! [`TokenValidator`]; the bundled [`StaticTokenValidator`] only recognizes a
//! sentinel token and a prefix and is meant for local development.

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

pub const WELL_KNOWN_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";
pub const DEFAULT_AUTHORIZATION_SERVER: &str = "https://auth.example.com";

/// What a validator learned about a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: Option<String>,
    pub scopes: Vec<String>,
}

impl TokenClaims {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> AuthResult<TokenClaims>;
}

/// Accepts one sentinel token or anything with a configured prefix.
pub struct StaticTokenValidator {
    static_token: String,
    token_prefix: String,
    scopes: Vec<String>,
}

impl StaticTokenValidator {
    pub fn new(
        static_token: impl Into<String>,
        token_prefix: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            static_token: static_token.into(),
            token_prefix: token_prefix.into(),
            scopes,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.static_token.clone(),
            config.token_prefix.clone(),
            config.allowed_scopes.clone(),
        )
    }
}

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> AuthResult<TokenClaims> {
        let matches_sentinel = !self.static_token.is_empty() && token == self.static_token;
        let matches_prefix = !self.token_prefix.is_empty() && token.starts_with(&self.token_prefix);

        if matches_sentinel || matches_prefix {
            Ok(TokenClaims {
                subject: None,
                scopes: self.scopes.clone(),
            })
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(header: &str) -> AuthResult<&str> {
    if header.is_empty() {
        return Err(AuthError::MissingHeader);
    }

    let (scheme, token) = header.split_once(' ').ok_or(AuthError::MalformedHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::UnsupportedScheme);
    }
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    if token.starts_with(char::is_whitespace) {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}

/// A rejected request, rendered by whichever transport is in front.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChallenge {
    pub status: u16,
    pub www_authenticate: String,
    pub body: Value,
}

/// OAuth 2.0 Protected Resource Metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bearer_methods_supported: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes_supported: Vec<String>,
}

pub fn resource_metadata_url(host: &str) -> String {
    format!("https://{}{}", host, WELL_KNOWN_RESOURCE_PATH)
}

/// Canonical resource URI with any API-Gateway stage prefix removed.
///
/// `/dev/mcp` with stage `dev` becomes `https://<host>/mcp`.
pub fn canonical_uri(host: &str, path: &str, stage: &str) -> String {
    let mut path = path;
    if !stage.is_empty() {
        let prefix = format!("/{}", stage);
        if let Some(rest) = path.strip_prefix(prefix.as_str()) {
            if rest.is_empty() {
                path = "/";
            } else if rest.starts_with('/') {
                path = rest;
            }
        }
    }

    let uri = format!("https://{}{}", host, path);
    uri.strip_suffix('/').map(str::to_string).unwrap_or(uri)
}

pub fn www_authenticate_header(metadata_url: &str, scope: &str) -> String {
    let mut header = format!("Bearer resource_metadata=\"{}\"", metadata_url);
    if !scope.is_empty() {
        header.push_str(&format!(", scope=\"{}\"", scope));
    }
    header
}

pub fn insufficient_scope_header(metadata_url: &str, scope: &str, description: &str) -> String {
    let mut header = format!(
        "Bearer error=\"insufficient_scope\", resource_metadata=\"{}\", scope=\"{}\"",
        metadata_url, scope
    );
    if !description.is_empty() {
        header.push_str(&format!(", error_description=\"{}\"", escape_quotes(description)));
    }
    header
}

fn escape_quotes(s: &str) -> String {
    s.replace('"', "\\\"")
}

pub struct AuthGate {
    config: AuthConfig,
    validator: Arc<dyn TokenValidator>,
}

impl AuthGate {
    pub fn new(config: AuthConfig) -> Self {
        let validator = Arc::new(StaticTokenValidator::from_config(&config));
        Self { config, validator }
    }

    pub fn with_validator(config: AuthConfig, validator: Arc<dyn TokenValidator>) -> Self {
        Self { config, validator }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn require_auth(&self) -> bool {
        self.config.require_auth
    }

    pub async fn validate_token(&self, token: &str) -> AuthResult<TokenClaims> {
        if !self.config.require_auth {
            return Ok(TokenClaims::anonymous());
        }
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        self.validator.validate(token).await
    }

    /// Check the token's scopes against the allow-list.
    ///
    /// Tokens that carry no scopes pass; scope policy only applies when the
    /// validator reports some.
    pub fn authorize(&self, claims: &TokenClaims) -> AuthResult<()> {
        if self.config.allowed_scopes.is_empty() || claims.scopes.is_empty() {
            return Ok(());
        }

        let allowed = claims
            .scopes
            .iter()
            .any(|s| self.config.allowed_scopes.contains(s));

        if allowed {
            Ok(())
        } else {
            Err(AuthError::InsufficientScope {
                required: self.config.default_scope.clone(),
            })
        }
    }

    /// Full check of an `Authorization` header value.
    pub async fn authenticate(&self, header: Option<&str>) -> AuthResult<TokenClaims> {
        if !self.config.require_auth {
            return Ok(TokenClaims::anonymous());
        }

        let token = extract_bearer_token(header.unwrap_or_default()).inspect_err(|e| {
            debug!("Rejected authorization header: {}", e);
        })?;

        let claims = self.validate_token(token).await.inspect_err(|e| {
            warn!("Token validation failed: {}", e);
        })?;

        self.authorize(&claims)?;
        Ok(claims)
    }

    pub fn challenge_response(&self, host: &str, error: &AuthError) -> AuthChallenge {
        let metadata_url = resource_metadata_url(host);
        AuthChallenge {
            status: 401,
            www_authenticate: www_authenticate_header(&metadata_url, &self.config.default_scope),
            body: json!({
                "error": "unauthorized",
                "error_description": format!("Authorization required: {}", error),
                "resource_metadata": metadata_url,
            }),
        }
    }

    pub fn insufficient_scope_response(
        &self,
        host: &str,
        scope: &str,
        description: &str,
    ) -> AuthChallenge {
        let metadata_url = resource_metadata_url(host);
        AuthChallenge {
            status: 403,
            www_authenticate: insufficient_scope_header(&metadata_url, scope, description),
            body: json!({
                "error": "insufficient_scope",
                "error_description": description,
                "required_scope": scope,
            }),
        }
    }

    /// Map a failed [`authenticate`](Self::authenticate) to its challenge.
    pub fn reject(&self, host: &str, error: &AuthError) -> AuthChallenge {
        match error {
            AuthError::InsufficientScope { required } => self.insufficient_scope_response(
                host,
                required,
                "The token does not grant a scope accepted by this server",
            ),
            other => self.challenge_response(host, other),
        }
    }

    /// Metadata for the resource at `resource_path`, with any deployment `stage`
    /// prefix removed from the advertised URI.
    pub fn resource_metadata(
        &self,
        host: &str,
        resource_path: &str,
        stage: &str,
    ) -> ProtectedResourceMetadata {
        let resource = canonical_uri(host, resource_path, stage);

        let authorization_servers = match &self.config.authorization_server {
            Some(server) if !server.is_empty() => vec![server.clone()],
            _ => vec![DEFAULT_AUTHORIZATION_SERVER.to_string()],
        };

        ProtectedResourceMetadata {
            resource,
            authorization_servers,
            bearer_methods_supported: vec!["header".to_string()],
            scopes_supported: self.config.allowed_scopes.clone(),
        }
    }
}
