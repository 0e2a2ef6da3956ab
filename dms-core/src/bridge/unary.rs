//! # Unary Bridge
//!
//! `POST /call/{method}`: `ReceiveBody -> Decode -> Invoke -> Encode -> Respond`.
//!
//! The request body is decoded against the method's input type before the backend is
//! dialed, so a malformed body never results in a partial call. Backend failures are
//! returned verbatim and never retried.
use crate::{
    codec,
    dispatcher::Dispatcher,
    error::GatewayError,
    registry::CallShape,
};
use axum::{
    body::Bytes,
    extract::{Path, State, rejection::BytesRejection},
    http::header,
    response::{IntoResponse, Response},
};

/// Axum handler for the unary call route.
pub async fn handle(
    State(dispatcher): State<Dispatcher>,
    Path(method): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let result = match body {
        Ok(body) => call(&dispatcher, &method, &body).await,
        Err(rejection) => Err(GatewayError::transport(rejection)),
    };

    match result {
        Ok(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(err) => {
            tracing::warn!(method = %method, error = %err, "Unary call failed");
            err.into_response()
        }
    }
}

/// Performs one unary call, returning the JSON encoded response.
pub async fn call(dispatcher: &Dispatcher, method: &str, body: &[u8]) -> Result<String, GatewayError> {
    let call = dispatcher.resolve(method)?;

    if call.route.shape() != CallShape::Unary {
        return Err(GatewayError::UnsupportedCallShape {
            method: method.to_string(),
            shape: call.route.shape(),
        });
    }

    let request = codec::decode_json(call.route.input(), body)?;

    // The connection is owned by this call and dropped on every exit path.
    let mut client = dispatcher.connect().await?;
    let response = client.unary(call.path, call.route.output(), request).await??;

    Ok(codec::encode_json(&response)?)
}
