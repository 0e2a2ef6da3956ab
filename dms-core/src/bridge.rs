//! # Bridges
//!
//! The two ways a call can cross the gateway:
//!
//! * [`unary`]: one JSON request body in, one JSON response body out, over plain HTTP.
//! * [`stream`]: a WebSocket session bound to one server-streaming backend call, each
//!   backend message forwarded as one text frame.
pub mod stream;
pub mod unary;
