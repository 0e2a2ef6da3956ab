//! # Gateway Errors
//!
//! Per-call failures raised by the bridges. They end the call or session they belong
//! to and never the server: unary calls render them as a `500` plain-text response,
//! streaming sessions as a WebSocket close frame.
use crate::{
    codec::CodecError,
    dispatcher::{ConnectError, DispatchError},
    grpc::client::GrpcRequestError,
    registry::CallShape,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::error::Error;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("Method '{method}' is {shape:?} and cannot be served on this route")]
    UnsupportedCallShape { method: String, shape: CallShape },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("{}", describe(.0))]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Request(#[from] GrpcRequestError),
    #[error("{}", render_status(.0))]
    Backend(#[from] tonic::Status),
}

impl GatewayError {
    pub fn transport(err: impl Error) -> Self {
        GatewayError::Transport(describe(&err))
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("error: {self}")).into_response()
    }
}

/// Renders a remote status the way gRPC clients conventionally print them.
pub fn render_status(status: &tonic::Status) -> String {
    format!("rpc error: code = {:?} desc = {}", status.code(), status.message())
}

/// Renders an error followed by its whole source chain, e.g.
/// `Failed to connect to 'http://[::1]:1/': transport error: tcp connect error: Connection refused`.
pub fn describe(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !out.ends_with(&cause_text) {
            out.push_str(": ");
            out.push_str(&cause_text);
        }
        source = cause.source();
    }
    out
}
