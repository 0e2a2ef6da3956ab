//! # DMS Core
//!
//! `dms-core` is the library powering the `dms-proxy` gateway. It exposes any gRPC
//! service as JSON over HTTP and WebSocket without compile-time knowledge of the
//! Protobuf schema: the only input is an encoded `FileDescriptorSet`.
//!
//! ## Key Components
//!
//! * **[`DescriptorRegistry`]:** Turns the descriptor set into immutable lookup tables of
//!   methods (by `package.Service.Method`) and message types (by fully-qualified name).
//! * **[`codec`]:** Reflection-driven JSON transcoding of `DynamicMessage` values.
//! * **[`Dispatcher`]:** Resolves an inbound method path into a [`MethodRoute`] and opens
//!   one fresh backend connection per call.
//! * **[`bridge`]:** The unary (HTTP) and streaming (WebSocket) bridges.
//! * **[`Gateway`]:** Binds the fixed route table and serves it.
//!
//! ## Internal transport
//!
//! * **[`grpc::client::GrpcClient`]:** A dynamic gRPC client carrying `DynamicMessage` values.
//! * **[`grpc::codec::DynamicCodec`]:** An implementation of `tonic::codec::Codec` that writes and
//!   reads Protobuf bytes for message types only known at runtime.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost-reflect` and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod bridge;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod grpc;
pub mod registry;
pub mod server;

pub use config::GatewayConfig;
pub use dispatcher::Dispatcher;
pub use error::GatewayError;
pub use registry::{CallShape, DescriptorRegistry, MethodRoute, SchemaError};
pub use server::{Gateway, StartupError};

// Re-exports
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
