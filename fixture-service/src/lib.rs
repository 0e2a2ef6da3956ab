//! # Fixture Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide gRPC server traits
//! and a descriptor set for integration testing the `dms` gateway.
//! It is not intended for production use.

pub mod pb {
    include!(concat!(env!("OUT_DIR"), "/pkg.rs"));
}

pub use pb::counter_server::{Counter, CounterServer};
pub use pb::geometry_server::{Geometry, GeometryServer};
pub use pb::greeter_server::{Greeter, GreeterServer};

pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("descriptors");
