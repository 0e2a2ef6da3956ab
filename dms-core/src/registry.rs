//! # Descriptor Registry
//!
//! This module handles the loading and querying of Protobuf `FileDescriptorSet`s.
//! It acts as the gateway's database of schema definitions: every service method is
//! indexed by its dotted name (`package.Service.Method`) and every message type,
//! nested ones included, by its fully-qualified name.
//!
//! The registry is built once at startup and never mutated afterwards, so it can be
//! shared behind an `Arc` by every concurrent call.
use prost::Message;
use prost_reflect::{DescriptorPool, MessageDescriptor, MethodDescriptor};
use prost_types::FileDescriptorSet;
use std::collections::{BTreeMap, HashMap};

/// Fatal errors raised while building the registry. None of them leave a partial registry behind.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to decode descriptor set: '{0}'")]
    Parse(#[from] prost::DecodeError),
    #[error("Descriptor set is inconsistent: '{0}'")]
    Inconsistent(#[from] prost_reflect::DescriptorError),
    #[error("Method '{method}' references unknown message type '{type_name}'")]
    UnresolvedType { method: String, type_name: String },
}

/// The four call shapes a gRPC method can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    Unary,
    ServerStreaming,
    ClientStreaming,
    Bidirectional,
}

impl CallShape {
    pub fn of(method: &MethodDescriptor) -> Self {
        match (method.is_client_streaming(), method.is_server_streaming()) {
            (false, false) => CallShape::Unary,
            (false, true) => CallShape::ServerStreaming,
            (true, false) => CallShape::ClientStreaming,
            (true, true) => CallShape::Bidirectional,
        }
    }

    pub fn is_client_streaming(self) -> bool {
        matches!(self, CallShape::ClientStreaming | CallShape::Bidirectional)
    }

    pub fn is_server_streaming(self) -> bool {
        matches!(self, CallShape::ServerStreaming | CallShape::Bidirectional)
    }
}

/// A callable method together with the resolved handles of its input and output types.
#[derive(Debug, Clone)]
pub struct MethodRoute {
    full_name: String,
    shape: CallShape,
    input: MessageDescriptor,
    output: MessageDescriptor,
}

impl MethodRoute {
    /// Dotted name of the method, e.g. `pkg.Greeter.SayHello`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn shape(&self) -> CallShape {
        self.shape
    }

    pub fn input(&self) -> &MessageDescriptor {
        &self.input
    }

    pub fn output(&self) -> &MessageDescriptor {
        &self.output
    }
}

/// Immutable method and message lookup tables built from a descriptor set.
#[derive(Debug, Clone)]
pub struct DescriptorRegistry {
    methods: BTreeMap<String, MethodRoute>,
    messages: HashMap<String, MessageDescriptor>,
}

impl DescriptorRegistry {
    /// Decodes an encoded `FileDescriptorSet` and indexes its methods and messages.
    ///
    /// Files may appear in any order: they are all linked into a single pool before any
    /// method is resolved, so a service may reference types declared in a later file.
    ///
    /// # Returns
    ///
    /// * `Ok(DescriptorRegistry)` - Every method's input and output type is registered.
    /// * `Err(SchemaError::Parse)` - The bytes are not a valid `FileDescriptorSet`.
    /// * `Err(SchemaError::Inconsistent)` - The files cannot be linked together.
    /// * `Err(SchemaError::UnresolvedType)` - A method names a type that is not registered.
    pub fn build(schema: &[u8]) -> Result<Self, SchemaError> {
        let file_set = FileDescriptorSet::decode(schema)?;
        let pool = DescriptorPool::from_file_descriptor_set(file_set)?;

        let messages: HashMap<String, MessageDescriptor> = pool
            .all_messages()
            .map(|message| (message.full_name().to_string(), message))
            .collect();

        let mut methods = BTreeMap::new();
        for service in pool.services() {
            for method in service.methods() {
                let proto = method.method_descriptor_proto();
                let full_name = method.full_name().to_string();
                let input = resolve_type(&messages, &full_name, proto.input_type())?;
                let output = resolve_type(&messages, &full_name, proto.output_type())?;

                let route = MethodRoute {
                    full_name: full_name.clone(),
                    shape: CallShape::of(&method),
                    input,
                    output,
                };
                methods.insert(full_name, route);
            }
        }

        Ok(Self { methods, messages })
    }

    /// Looks up a method by its dotted name (`package.Service.Method`).
    pub fn method(&self, full_name: &str) -> Option<&MethodRoute> {
        self.methods.get(full_name)
    }

    /// Looks up a message type by its fully-qualified name (`package.Message`).
    pub fn message(&self, full_name: &str) -> Option<&MessageDescriptor> {
        self.messages.get(full_name)
    }

    /// All registered methods, ordered by name.
    pub fn methods(&self) -> impl Iterator<Item = &MethodRoute> {
        self.methods.values()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

// Type references inside descriptors are absolute and carry a leading dot (`.pkg.Message`).
fn resolve_type(
    messages: &HashMap<String, MessageDescriptor>,
    method: &str,
    type_name: &str,
) -> Result<MessageDescriptor, SchemaError> {
    let name = type_name.strip_prefix('.').unwrap_or(type_name);
    messages
        .get(name)
        .cloned()
        .ok_or_else(|| SchemaError::UnresolvedType {
            method: method.to_string(),
            type_name: name.to_string(),
        })
}
