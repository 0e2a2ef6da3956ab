//! # Streaming Bridge
//!
//! `GET /stream/{method}`: `Upgrade -> [InitialSend] -> StreamLoop -> Close`.
//!
//! Each session runs on the task spawned by the upgrade and exclusively owns its
//! WebSocket, its backend connection and its backend stream. The session reports how it
//! ended through [`SessionEnd`] or a [`GatewayError`], and the socket is closed based on
//! that outcome:
//!
//! * backend stream completed: close code `1000`.
//! * any failure: close code `1011` with the error text as reason.
//! * client went away: nothing left to close, the backend stream is dropped.
//!
//! Backend messages are forwarded in the order they are received, one text frame each.
use crate::{
    codec,
    dispatcher::{Dispatcher, ResolvedCall},
    error::GatewayError,
};
use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket, close_code},
    },
    response::{IntoResponse, Response},
};
use futures_util::stream;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use std::time::Duration;

/// Close reasons must fit in a control frame (125 bytes, minus the status code).
const MAX_CLOSE_REASON_BYTES: usize = 123;

/// How long to wait for the client to acknowledge our close frame.
const CLOSE_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The backend stream finished without error.
    Completed,
    /// The client closed the session or its connection dropped.
    ClientGone,
}

/// Axum handler for the streaming route.
///
/// The method is resolved before upgrading, so unknown or non-streaming methods are
/// answered with a plain HTTP error instead of a session.
pub async fn handle(
    State(dispatcher): State<Dispatcher>,
    Path(method): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let call = match resolve(&dispatcher, &method) {
        Ok(call) => call,
        Err(err) => {
            tracing::warn!(method = %method, error = %err, "Rejected streaming session");
            return err.into_response();
        }
    };

    ws.on_upgrade(move |socket| run(socket, dispatcher, call))
}

fn resolve(dispatcher: &Dispatcher, method: &str) -> Result<ResolvedCall, GatewayError> {
    let call = dispatcher.resolve(method)?;

    if !call.route.shape().is_server_streaming() {
        return Err(GatewayError::UnsupportedCallShape {
            method: method.to_string(),
            shape: call.route.shape(),
        });
    }

    Ok(call)
}

/// Drives one session to completion and closes the socket on every exit path.
async fn run(mut socket: WebSocket, dispatcher: Dispatcher, call: ResolvedCall) {
    let method = call.route.full_name().to_string();
    tracing::debug!(method = %method, "Streaming session opened");

    let frame = match forward(&mut socket, &dispatcher, call).await {
        Ok(SessionEnd::Completed) => Some(CloseFrame {
            code: close_code::NORMAL,
            reason: "".into(),
        }),
        Ok(SessionEnd::ClientGone) => None,
        Err(err) => {
            tracing::warn!(method = %method, error = %err, "Streaming session failed");
            Some(CloseFrame {
                code: close_code::ERROR,
                reason: close_reason(&err.to_string()).into(),
            })
        }
    };

    if let Some(frame) = frame {
        close(&mut socket, frame).await;
    }

    tracing::debug!(method = %method, "Streaming session closed");
}

/// Runs the session: optional initial request, then the receive loop.
async fn forward(
    socket: &mut WebSocket,
    dispatcher: &Dispatcher,
    call: ResolvedCall,
) -> Result<SessionEnd, GatewayError> {
    let initial = if call.route.shape().is_client_streaming() {
        None
    } else {
        match receive_initial(socket, call.route.input()).await? {
            Some(request) => Some(request),
            None => return Ok(SessionEnd::ClientGone),
        }
    };

    let path = call.path;
    let output = call.route.output();
    let open = async {
        let mut client = dispatcher.connect().await?;
        let responses = match initial {
            Some(request) => client.server_streaming(path, output, request).await??,
            // Client streaming methods get no request messages: the outbound half stays
            // open and empty for the lifetime of the session.
            None => {
                client
                    .streaming(path, output, stream::pending::<DynamicMessage>())
                    .await??
            }
        };
        Ok::<_, GatewayError>((client, responses))
    };

    // Dialing and waiting for response headers can take a while; a client leaving
    // meanwhile drops the pending call.
    // The client owns the connection and is kept for the whole session.
    let (_client, mut responses) = tokio::select! {
        opened = open => opened?,
        _ = client_gone(socket) => return Ok(SessionEnd::ClientGone),
    };

    loop {
        tokio::select! {
            next = responses.message() => match next? {
                Some(message) => {
                    let json = codec::encode_json(&message)?;
                    socket
                        .send(Message::Text(json.into()))
                        .await
                        .map_err(GatewayError::transport)?;
                }
                None => return Ok(SessionEnd::Completed),
            },
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    return Ok(SessionEnd::ClientGone);
                }
                // Nothing else is read from the client once the call is running.
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Resolves once the client closes the session or its connection drops.
/// Any other inbound frame is discarded.
async fn client_gone(socket: &mut WebSocket) {
    while let Some(Ok(frame)) = socket.recv().await {
        if let Message::Close(_) = frame {
            return;
        }
    }
}

/// Waits for the single request message of a non client-streaming method.
///
/// Returns `None` if the client closes the session before sending it.
async fn receive_initial(
    socket: &mut WebSocket,
    input: &MessageDescriptor,
) -> Result<Option<DynamicMessage>, GatewayError> {
    while let Some(frame) = socket.recv().await {
        let request = match frame.map_err(GatewayError::transport)? {
            Message::Text(text) => codec::decode_json(input, text.as_str().as_bytes())?,
            Message::Binary(data) => codec::decode_json(input, &data)?,
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => return Ok(None),
        };
        return Ok(Some(request));
    }

    Ok(None)
}

async fn close(socket: &mut WebSocket, frame: CloseFrame) {
    if socket.send(Message::Close(Some(frame))).await.is_err() {
        return;
    }

    // Drain until the client answers with its own close frame or goes away.
    let drain = async { while let Some(Ok(_)) = socket.recv().await {} };
    let _ = tokio::time::timeout(CLOSE_GRACE_PERIOD, drain).await;
}

fn close_reason(text: &str) -> String {
    if text.len() <= MAX_CLOSE_REASON_BYTES {
        return text.to_string();
    }

    let mut end = MAX_CLOSE_REASON_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
