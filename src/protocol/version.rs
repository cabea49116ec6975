//! `MCP-Protocol-Version` negotiation.

/// Version advertised when the client does not ask for one.
pub const CURRENT_PROTOCOL_VERSION: &str = "2025-06-18";

/// Older version still accepted for compatibility.
pub const FALLBACK_PROTOCOL_VERSION: &str = "2024-11-05";

/// Every version the server accepts, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 2] =
    [CURRENT_PROTOCOL_VERSION, FALLBACK_PROTOCOL_VERSION];

/// Validate an optional protocol version header value.
///
/// An absent header is accepted so that clients predating the header keep working.
pub fn validate(version: Option<&str>) -> bool {
    match version {
        None => true,
        Some(v) => is_supported(v),
    }
}

pub fn is_supported(version: &str) -> bool {
    SUPPORTED_PROTOCOL_VERSIONS.contains(&version)
}

/// Version to echo back in response headers.
pub fn negotiated(version: Option<&str>) -> &str {
    version.unwrap_or(CURRENT_PROTOCOL_VERSION)
}

/// Version reported in the `initialize` result.
///
/// Honors the version the client asked for in its params when supported.
pub fn for_initialize(requested: Option<&str>) -> &'static str {
    match requested {
        Some(v) if v == FALLBACK_PROTOCOL_VERSION => FALLBACK_PROTOCOL_VERSION,
        _ => CURRENT_PROTOCOL_VERSION,
    }
}
