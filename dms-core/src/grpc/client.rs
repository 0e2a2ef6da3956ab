//! # Generic gRPC Client
//!
//! This module wraps a standard `tonic` client to provide a generic interface for
//! gRPC communication. It is agnostic to the specific Protobuf messages being exchanged.
//!
//! ## How it works
//!
//! The [`GrpcClient`] utilizes the [`super::codec::DynamicCodec`] to handle serialization.
//! Callers hand it an already decoded `DynamicMessage`, the wire path of the method
//! (e.g., `/package.Service/Method`) and the descriptor of the expected response type.
//!
//! ## Access Patterns
//!
//! * **Unary**: one request, one response.
//! * **Server Streaming**: one request, a stream of responses.
//! * **Streaming**: a stream of requests, a stream of responses.
use super::codec::DynamicCodec;
use crate::BoxError;
use futures_util::Stream;
use http::uri::PathAndQuery;
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use tonic::{Streaming, client::GrpcService, transport::Channel};

#[derive(thiserror::Error, Debug)]
pub enum GrpcRequestError {
    #[error("Internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),
}

/// A generic client that performs gRPC calls with runtime-described messages.
#[derive(Debug, Clone)]
pub struct GrpcClient<S = Channel> {
    client: tonic::client::Grpc<S>,
}

impl<S> GrpcClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        Self { client }
    }

    /// Performs a Unary gRPC call (Single Request -> Single Response).
    ///
    /// # Returns
    /// * `Ok(Ok(DynamicMessage))` - Successful RPC execution.
    /// * `Ok(Err(Status))` - RPC executed, but server returned an error.
    /// * `Err(GrpcRequestError)` - Failed to send the request.
    pub async fn unary(
        &mut self,
        path: PathAndQuery,
        output: &MessageDescriptor,
        payload: DynamicMessage,
    ) -> Result<Result<DynamicMessage, tonic::Status>, GrpcRequestError> {
        self.ready().await?;

        let codec = DynamicCodec::new(output.clone());
        let request = tonic::Request::new(payload);

        match self.client.unary(request, path, codec).await {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }

    /// Performs a Server Streaming gRPC call (Single Request -> Stream of Responses).
    ///
    /// # Returns
    ///
    /// * `Ok(Ok(Streaming))` - The call was accepted, responses can be pulled from the stream.
    /// * `Ok(Err(Status))` - RPC executed, but server returned an error.
    /// * `Err(GrpcRequestError)` - Failed to send the request.
    pub async fn server_streaming(
        &mut self,
        path: PathAndQuery,
        output: &MessageDescriptor,
        payload: DynamicMessage,
    ) -> Result<Result<Streaming<DynamicMessage>, tonic::Status>, GrpcRequestError> {
        self.ready().await?;

        let codec = DynamicCodec::new(output.clone());
        let request = tonic::Request::new(payload);

        match self.client.server_streaming(request, path, codec).await {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }

    /// Performs a Bidirectional Streaming gRPC call (Stream of Requests -> Stream of Responses).
    ///
    /// # Returns
    ///
    /// * `Ok(Ok(Streaming))` - The call was accepted, responses can be pulled from the stream.
    /// * `Ok(Err(Status))` - RPC executed, but server returned an error.
    /// * `Err(GrpcRequestError)` - Failed to send the request.
    pub async fn streaming(
        &mut self,
        path: PathAndQuery,
        output: &MessageDescriptor,
        payload_stream: impl Stream<Item = DynamicMessage> + Send + 'static,
    ) -> Result<Result<Streaming<DynamicMessage>, tonic::Status>, GrpcRequestError> {
        self.ready().await?;

        let codec = DynamicCodec::new(output.clone());
        let request = tonic::Request::new(payload_stream);

        match self.client.streaming(request, path, codec).await {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }

    async fn ready(&mut self) -> Result<(), GrpcRequestError> {
        self.client
            .ready()
            .await
            .map_err(|e| GrpcRequestError::ClientNotReady(e.into()))
    }
}
