//! # CLI
//!
//! This module defines the command-line interface of `dms-proxy` using `clap`.
//!
//! Every flag can also be provided through an environment variable.
use clap::Parser;
use dms_core::{GatewayConfig, config};
use std::{path::PathBuf, time::Duration};

#[derive(Parser)]
#[command(name = "dms-proxy", version, about = "Serve a gRPC backend as JSON over HTTP and WebSocket")]
pub struct Cli {
    /// Target gRPC server endpoint (host:port)
    #[arg(long, env = "DMS_ENDPOINT", default_value = config::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Address the gateway listens on
    #[arg(long, env = "DMS_BIND", default_value = config::DEFAULT_BIND)]
    pub bind: String,

    /// Path to the descriptor set (.bin) describing the backend's services
    #[arg(long, env = "DMS_DESCRIPTOR_SET")]
    pub descriptor_set: PathBuf,

    /// Fail backend dials that take longer than this many milliseconds
    #[arg(long, env = "DMS_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Fail backend calls that take longer than this many milliseconds
    #[arg(long, env = "DMS_CALL_TIMEOUT_MS")]
    pub call_timeout_ms: Option<u64>,

    /// Largest accepted request body for unary calls
    #[arg(long, env = "DMS_MAX_BODY_BYTES", default_value_t = config::DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

impl Cli {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            bind: self.bind.clone(),
            endpoint: self.endpoint.clone(),
            connect_timeout: self.connect_timeout_ms.map(Duration::from_millis),
            call_timeout: self.call_timeout_ms.map(Duration::from_millis),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["dms-proxy", "--descriptor-set", "descriptors.bin"]).unwrap();
        let config = cli.gateway_config();

        assert_eq!(cli.descriptor_set, PathBuf::from("descriptors.bin"));
        assert_eq!(config.endpoint, "localhost:50051");
        assert_eq!(config.bind, "localhost:6975");
        assert!(config.call_timeout.is_none());
    }

    #[test]
    fn test_timeouts() {
        let cli = Cli::try_parse_from([
            "dms-proxy",
            "--descriptor-set",
            "descriptors.bin",
            "--endpoint",
            "10.0.0.7:9000",
            "--call-timeout-ms",
            "1500",
        ])
        .unwrap();
        let config = cli.gateway_config();

        assert_eq!(config.endpoint, "10.0.0.7:9000");
        assert_eq!(config.call_timeout, Some(Duration::from_millis(1500)));
        assert!(config.connect_timeout.is_none());
    }

    #[test]
    fn test_descriptor_set_is_required() {
        assert!(Cli::try_parse_from(["dms-proxy"]).is_err());
    }
}
