//! # Call Dispatcher
//!
//! Resolves the dotted method identifier of an inbound route (`pkg.Service.Method`)
//! into a [`ResolvedCall`] and opens backend connections.
//!
//! Connections are never pooled: every call dials its own [`Channel`], which is
//! released when the caller drops the returned [`GrpcClient`].
use crate::{
    config::GatewayConfig,
    grpc::client::GrpcClient,
    registry::{DescriptorRegistry, MethodRoute},
};
use http::uri::PathAndQuery;
use std::{str::FromStr, sync::Arc};
use tonic::transport::{Channel, Endpoint};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("bad service: '{0}'")]
    MethodNotFound(String),
    #[error("Invalid method path '{0}', expected 'package.Service.Method'")]
    InvalidPath(String),
}

/// Errors that can occur when dialing the backend.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Invalid backend URL '{0}': {1}")]
    InvalidUrl(String, #[source] tonic::transport::Error),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
}

/// A method resolved for one inbound call.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub route: MethodRoute,
    /// Backend wire path, e.g. `/pkg.Greeter/SayHello`.
    pub path: PathAndQuery,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<DescriptorRegistry>,
    endpoint: Endpoint,
}

impl Dispatcher {
    pub fn new(registry: Arc<DescriptorRegistry>, config: &GatewayConfig) -> Result<Self, ConnectError> {
        let uri = config.backend_uri();
        let mut endpoint =
            Endpoint::new(uri.clone()).map_err(|e| ConnectError::InvalidUrl(uri, e))?;

        if let Some(timeout) = config.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        if let Some(timeout) = config.call_timeout {
            endpoint = endpoint.timeout(timeout);
        }

        Ok(Self { registry, endpoint })
    }

    /// Looks up `method_path` and computes its backend wire path.
    ///
    /// Input and output handles were resolved when the registry was built, so a known
    /// method always carries both.
    ///
    /// # Returns
    ///
    /// * `Ok(ResolvedCall)` - The method exists.
    /// * `Err(DispatchError::MethodNotFound)` - No method has this name.
    /// * `Err(DispatchError::InvalidPath)` - The name cannot form a wire path.
    pub fn resolve(&self, method_path: &str) -> Result<ResolvedCall, DispatchError> {
        let route = self
            .registry
            .method(method_path)
            .ok_or_else(|| DispatchError::MethodNotFound(method_path.to_string()))?;

        Ok(ResolvedCall {
            route: route.clone(),
            path: wire_path(method_path)?,
        })
    }

    /// Dials a fresh connection to the backend.
    pub async fn connect(&self) -> Result<GrpcClient<Channel>, ConnectError> {
        let channel = self.endpoint.connect().await.map_err(|e| {
            ConnectError::ConnectionFailed(self.endpoint.uri().to_string(), e)
        })?;

        Ok(GrpcClient::new(channel))
    }
}

/// Re-joins a dotted method identifier into a gRPC path: the last segment is the
/// method, the remainder is the service's qualified name.
pub fn wire_path(method_path: &str) -> Result<PathAndQuery, DispatchError> {
    let invalid = || DispatchError::InvalidPath(method_path.to_string());

    let (service, method) = method_path.rsplit_once('.').ok_or_else(invalid)?;
    if service.is_empty() || method.is_empty() {
        return Err(invalid());
    }

    PathAndQuery::from_str(&format!("/{service}/{method}")).map_err(|_| invalid())
}
