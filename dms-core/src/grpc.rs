//! # Generic gRPC Transport
//!
//! This module contains the low-level building blocks for performing gRPC calls using
//! dynamic message types.
//!
//! Unlike standard `tonic` clients which are strongly typed (e.g., `HelloRequest`),
//! the components here carry `prost_reflect::DynamicMessage` values whose shape is
//! only known through a runtime `MessageDescriptor`.
pub mod client;
pub mod codec;
