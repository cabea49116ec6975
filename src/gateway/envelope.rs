//! Transport-neutral request/response envelope and its API-Gateway proxy mapping.

use crate::auth::AuthChallenge;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayRequest {
    pub http_method: String,
    pub path: String,
    /// API-Gateway deployment stage, empty outside serverless deployments.
    pub stage: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl GatewayRequest {
    pub fn new(http_method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_method: http_method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }

    /// Header lookup tolerant of however the front end spelled the name.
    ///
    /// Tries the exact spelling first, then any case-insensitive match.
    /// Empty values count as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Host from `Host`, then `X-Forwarded-Host`, else `localhost`.
    pub fn host(&self) -> &str {
        self.header("Host")
            .or_else(|| self.header("X-Forwarded-Host"))
            .unwrap_or("localhost")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl GatewayResponse {
    /// Bodiless response. Every response carries the permissive CORS origin.
    pub fn empty(status: u16) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(ALLOW_ORIGIN.to_string(), "*".to_string());
        Self {
            status,
            headers,
            body: String::new(),
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        let mut response = Self::empty(status).with_header(CONTENT_TYPE, "application/json");
        response.body = body.to_string();
        response
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

impl From<AuthChallenge> for GatewayResponse {
    fn from(challenge: AuthChallenge) -> Self {
        GatewayResponse::json(challenge.status, &challenge.body)
            .with_header("WWW-Authenticate", challenge.www_authenticate)
    }
}

/// API-Gateway REST proxy integration event (the subset the gateway reads).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default)]
    pub http_method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
    #[serde(default)]
    pub request_context: Option<ProxyRequestContext>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequestContext {
    #[serde(default)]
    pub stage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl ProxyRequest {
    /// Convert into the neutral envelope, decoding base64 bodies.
    ///
    /// A body that claims to be base64 but is not decodes to an empty body,
    /// which the gateway rejects as a bad request.
    pub fn into_gateway_request(self) -> GatewayRequest {
        let body = self.body.unwrap_or_default();
        let body = if self.is_base64_encoded {
            STANDARD
                .decode(body.as_bytes())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .unwrap_or_default()
        } else {
            body
        };

        GatewayRequest {
            http_method: self.http_method.to_uppercase(),
            path: self.path,
            stage: self
                .request_context
                .and_then(|ctx| ctx.stage)
                .unwrap_or_default(),
            headers: self.headers.unwrap_or_default(),
            body,
        }
    }
}

impl From<ProxyRequest> for GatewayRequest {
    fn from(event: ProxyRequest) -> Self {
        event.into_gateway_request()
    }
}

impl From<GatewayResponse> for ProxyResponse {
    fn from(response: GatewayResponse) -> Self {
        Self {
            status_code: response.status,
            headers: response.headers,
            body: response.body,
            is_base64_encoded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_lookup_spellings() {
        let request = GatewayRequest::new("POST", "/mcp")
            .with_header("mcp-session-id", "abc")
            .with_header("Authorization", "Bearer t")
            .with_header("Mcp-Protocol-Version", "");

        assert_eq!(request.header("Mcp-Session-Id"), Some("abc"));
        assert_eq!(request.header("authorization"), Some("Bearer t"));
        assert_eq!(request.header("MCP-Protocol-Version"), None);
    }

    #[test]
    fn test_host_fallbacks() {
        let request = GatewayRequest::new("GET", "/");
        assert_eq!(request.host(), "localhost");

        let request = request.with_header("x-forwarded-host", "edge.example.com");
        assert_eq!(request.host(), "edge.example.com");

        let request = request.with_header("host", "api.example.com");
        assert_eq!(request.host(), "api.example.com");
    }

    #[test]
    fn test_proxy_event_mapping() {
        let event: ProxyRequest = serde_json::from_value(json!({
            "httpMethod": "post",
            "path": "/dev/mcp",
            "headers": null,
            "body": "{\"jsonrpc\":\"2.0\"}",
            "requestContext": { "stage": "dev" }
        }))
        .unwrap();

        let request = GatewayRequest::from(event);
        assert_eq!(request.http_method, "POST");
        assert_eq!(request.stage, "dev");
        assert!(request.headers.is_empty());
        assert_eq!(request.body, "{\"jsonrpc\":\"2.0\"}");
    }

    #[test]
    fn test_base64_body() {
        let event = ProxyRequest {
            http_method: "POST".into(),
            body: Some(STANDARD.encode("{}")),
            is_base64_encoded: true,
            ..Default::default()
        };
        assert_eq!(event.into_gateway_request().body, "{}");
    }

    #[test]
    fn test_proxy_response_shape() {
        let response = GatewayResponse::json(200, &json!({"ok": true}));
        let value = serde_json::to_value(ProxyResponse::from(response)).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["headers"]["Content-Type"], "application/json");
        assert_eq!(value["headers"]["Access-Control-Allow-Origin"], "*");
        assert_eq!(value["body"], "{\"ok\":true}");
        assert_eq!(value["isBase64Encoded"], false);
    }
}
