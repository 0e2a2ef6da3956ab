//! # Gateway Configuration
//!
//! Settings for the listening side (bind address, body limit) and the backend side
//! (endpoint, optional timeouts) of the gateway.
//!
//! Timeouts are disabled by default: a hung backend call then blocks only its own
//! request or session. Setting them bounds dialing and each backend call through
//! `tonic::transport::Endpoint`.
use std::time::Duration;

pub const DEFAULT_BIND: &str = "localhost:6975";
pub const DEFAULT_ENDPOINT: &str = "localhost:50051";
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP server listens on.
    pub bind: String,
    /// Backend gRPC server, `host:port` or a full `http://` URI.
    pub endpoint: String,
    pub connect_timeout: Option<Duration>,
    pub call_timeout: Option<Duration>,
    /// Upper bound for unary request bodies.
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: None,
            call_timeout: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl GatewayConfig {
    /// The backend endpoint as a URI. Bare `host:port` endpoints are dialed in plaintext.
    pub fn backend_uri(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            format!("http://{}", self.endpoint)
        }
    }
}
