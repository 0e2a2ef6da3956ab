//! # JSON <-> DynamicMessage Codec
//!
//! Reflection-driven transcoding between JSON documents and `DynamicMessage` values,
//! built on the `serde` support of `prost-reflect`.
//!
//! ## Decoding (JSON -> Proto)
//!
//! - Fields are matched by their JSON name (`upTo`) or their proto name (`up_to`).
//! - Unknown fields are ignored, missing fields keep their zero value.
//! - Type mismatches are rejected.
//! - At most one member of each oneof group may be populated, at any nesting depth.
//!
//! ## Encoding (Proto -> JSON)
//!
//! - Every declared field is emitted, zero values included, so consumers can rely on
//!   field presence. Unset message fields and proto2 optionals are emitted as `null`;
//!   unset oneof members (proto3 `optional` included) are left out.
//! - Enums are emitted as their numeric value.
use prost_reflect::{
    DeserializeOptions, DynamicMessage, FieldDescriptor, Kind, MessageDescriptor,
    ReflectMessage, SerializeOptions,
};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("JSON does not match message '{message}': '{source}'")]
    Decode {
        message: String,
        source: serde_json::Error,
    },
    #[error("Expected a JSON object for message '{0}'")]
    NotAnObject(String),
    #[error("Multiple fields provided for oneof '{oneof}': '{first}' and '{second}'")]
    OneofConflict {
        oneof: String,
        first: String,
        second: String,
    },
    #[error("Failed to encode message '{message}' as JSON: '{source}'")]
    Encode {
        message: String,
        source: serde_json::Error,
    },
}

/// Allocates an empty instance of the given message type.
pub fn new_instance(handle: &MessageDescriptor) -> DynamicMessage {
    DynamicMessage::new(handle.clone())
}

/// Decodes a JSON document into a new instance of `handle`.
pub fn decode_json(handle: &MessageDescriptor, json: &[u8]) -> Result<DynamicMessage, CodecError> {
    let value: Value = serde_json::from_slice(json).map_err(|source| CodecError::Decode {
        message: handle.full_name().to_string(),
        source,
    })?;
    decode_value(handle, value)
}

/// Decodes an already parsed JSON value into a new instance of `handle`.
pub fn decode_value(handle: &MessageDescriptor, value: Value) -> Result<DynamicMessage, CodecError> {
    if !value.is_object() {
        return Err(CodecError::NotAnObject(handle.full_name().to_string()));
    }

    check_oneofs(handle, &value)?;

    let options = DeserializeOptions::new().deny_unknown_fields(false);
    DynamicMessage::deserialize_with_options(handle.clone(), value, &options).map_err(|source| {
        CodecError::Decode {
            message: handle.full_name().to_string(),
            source,
        }
    })
}

/// Encodes a message as a JSON object, emitting every declared field and enums as numbers.
pub fn encode_json(message: &DynamicMessage) -> Result<String, CodecError> {
    let options = SerializeOptions::new()
        .skip_default_fields(false)
        .use_enum_numbers(true);

    let desc = message.descriptor();
    let mut value = message
        .serialize_with_options(serde_json::value::Serializer, &options)
        .map_err(|source| CodecError::Encode {
            message: desc.full_name().to_string(),
            source,
        })?;

    fill_unpopulated(&desc, &mut value);
    Ok(value.to_string())
}

// `skip_default_fields(false)` only writes defaults for fields without presence, so
// unset fields that track presence are added here as `null`. Oneof members stay absent.
fn fill_unpopulated(desc: &MessageDescriptor, value: &mut Value) {
    if desc.package_name() == "google.protobuf" {
        return;
    }
    let Value::Object(object) = value else {
        return;
    };

    for field in desc.fields() {
        let key = field.json_name();
        if !object.contains_key(key) {
            if !field.is_list() && !field.is_map() && field.containing_oneof().is_none() {
                object.insert(key.to_string(), Value::Null);
            }
            continue;
        }

        let Kind::Message(nested) = field.kind() else {
            continue;
        };
        let Some(member) = object.get_mut(key) else {
            continue;
        };

        if field.is_map() {
            let Kind::Message(value_desc) = nested.map_entry_value_field().kind() else {
                continue;
            };
            if let Value::Object(entries) = member {
                for entry in entries.values_mut() {
                    fill_unpopulated(&value_desc, entry);
                }
            }
        } else if field.is_list() {
            if let Value::Array(items) = member {
                for item in items.iter_mut() {
                    fill_unpopulated(&nested, item);
                }
            }
        } else {
            fill_unpopulated(&nested, member);
        }
    }
}

// Walks the JSON value alongside the descriptor and rejects objects that populate more
// than one member of the same oneof. Shape errors are left to the deserializer.
fn check_oneofs(desc: &MessageDescriptor, value: &Value) -> Result<(), CodecError> {
    let Value::Object(object) = value else {
        return Ok(());
    };

    for oneof in desc.oneofs().filter(|oneof| !oneof.is_synthetic()) {
        let mut populated: Option<&str> = None;
        for field in oneof.fields() {
            let Some((key, _)) = lookup(object, &field) else {
                continue;
            };
            if let Some(first) = populated {
                return Err(CodecError::OneofConflict {
                    oneof: oneof.full_name().to_string(),
                    first: first.to_string(),
                    second: key.to_string(),
                });
            }
            populated = Some(key);
        }
    }

    for field in desc.fields() {
        let Kind::Message(nested) = field.kind() else {
            continue;
        };
        let Some((_, nested_value)) = lookup(object, &field) else {
            continue;
        };

        if field.is_map() {
            let Kind::Message(value_desc) = nested.map_entry_value_field().kind() else {
                continue;
            };
            if let Value::Object(entries) = nested_value {
                for entry in entries.values() {
                    check_message(&value_desc, entry)?;
                }
            }
        } else if field.is_list() {
            if let Value::Array(items) = nested_value {
                for item in items {
                    check_message(&nested, item)?;
                }
            }
        } else {
            check_message(&nested, nested_value)?;
        }
    }

    Ok(())
}

// Well-known types have their own JSON mapping (a `Struct` is any object), so their
// members cannot be matched against object keys.
fn check_message(desc: &MessageDescriptor, value: &Value) -> Result<(), CodecError> {
    if desc.package_name() == "google.protobuf" {
        return Ok(());
    }
    check_oneofs(desc, value)
}

/// Finds a non-null member for `field`, accepting both its JSON name and its proto name.
fn lookup<'a>(object: &'a Map<String, Value>, field: &FieldDescriptor) -> Option<(&'a str, &'a Value)> {
    [field.json_name(), field.name()]
        .into_iter()
        .filter_map(|key| object.get_key_value(key))
        .find(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.as_str(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DescriptorRegistry;
    use fixture_service::FILE_DESCRIPTOR_SET;
    use serde_json::json;

    fn handle(name: &str) -> MessageDescriptor {
        DescriptorRegistry::build(FILE_DESCRIPTOR_SET)
            .unwrap()
            .message(name)
            .unwrap()
            .clone()
    }

    fn to_value(message: &DynamicMessage) -> Value {
        serde_json::from_str(&encode_json(message).unwrap()).unwrap()
    }

    #[test]
    fn test_new_instance_encodes_every_scalar_field() {
        let encoded = to_value(&new_instance(&handle("pkg.Shape")));

        assert_eq!(encoded["label"], "");
        assert_eq!(encoded["mood"], 0);
        assert_eq!(encoded["tags"], json!([]));
        assert_eq!(encoded["serial"], "0");
        assert_eq!(encoded["visible"], false);
        assert_eq!(encoded["children"], json!([]));
        assert_eq!(encoded["named"], json!({}));
    }

    #[test]
    fn test_unset_message_fields_encode_as_null() {
        let encoded = to_value(&new_instance(&handle("pkg.Shape")));
        let object = encoded.as_object().unwrap();

        assert_eq!(object.get("origin"), Some(&Value::Null));
        // Oneof members, proto3 optional included, are only emitted when set.
        assert!(!object.contains_key("circle"));
        assert!(!object.contains_key("rect"));
        assert!(!object.contains_key("note"));
    }

    #[test]
    fn test_unset_message_fields_are_filled_at_every_depth() {
        let shape = handle("pkg.Shape");
        let message = decode_json(
            &shape,
            br#"{"origin": {"radius": 2}, "children": [{}], "named": {"a": {"rect": {}}}}"#,
        )
        .unwrap();
        let encoded = to_value(&message);

        assert_eq!(encoded["origin"], json!({ "radius": 2.0 }));
        assert_eq!(encoded["children"][0]["origin"], Value::Null);
        assert_eq!(encoded["children"][0]["label"], "");
        assert_eq!(encoded["named"]["a"]["origin"], Value::Null);
        assert_eq!(encoded["named"]["a"]["rect"], json!({ "width": 0.0, "height": 0.0 }));
    }

    #[test]
    fn test_decode_uses_json_names_and_proto_names() {
        let count = handle("pkg.CountRequest");

        let by_json_name = decode_json(&count, br#"{"upTo": 3}"#).unwrap();
        assert_eq!(to_value(&by_json_name), json!({ "upTo": 3 }));

        let by_proto_name = decode_json(&count, br#"{"up_to": 4}"#).unwrap();
        assert_eq!(to_value(&by_proto_name), json!({ "upTo": 4 }));
    }

    #[test]
    fn test_decode_ignores_unknown_and_defaults_missing_fields() {
        let hello = handle("pkg.HelloRequest");

        let message = decode_json(&hello, br#"{"name": "world", "extra": [1, 2]}"#).unwrap();
        assert_eq!(to_value(&message), json!({ "name": "world" }));

        let empty = decode_json(&hello, b"{}").unwrap();
        assert_eq!(to_value(&empty), json!({ "name": "" }));
    }

    #[test]
    fn test_decode_rejects_type_mismatch() {
        let err = decode_json(&handle("pkg.CountRequest"), br#"{"upTo": "three"}"#).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }

    #[test]
    fn test_decode_rejects_malformed_and_non_object_json() {
        let hello = handle("pkg.HelloRequest");

        assert!(matches!(
            decode_json(&hello, b"{\"name\":").unwrap_err(),
            CodecError::Decode { .. }
        ));
        assert!(matches!(
            decode_json(&hello, b"[1, 2]").unwrap_err(),
            CodecError::NotAnObject(name) if name == "pkg.HelloRequest"
        ));
    }

    #[test]
    fn test_enums_encode_as_numbers() {
        let shape = handle("pkg.Shape");

        let by_name = decode_json(&shape, br#"{"mood": "MOOD_GRUMPY"}"#).unwrap();
        assert_eq!(to_value(&by_name)["mood"], 2);

        let by_number = decode_json(&shape, br#"{"mood": 1}"#).unwrap();
        assert_eq!(to_value(&by_number)["mood"], 1);
    }

    #[test]
    fn test_oneof_accepts_zero_or_one_alternative() {
        let shape = handle("pkg.Shape");

        assert!(decode_json(&shape, br#"{"label": "none"}"#).is_ok());

        let circle = decode_json(&shape, br#"{"circle": {"radius": 2.5}}"#).unwrap();
        assert_eq!(to_value(&circle)["circle"], json!({ "radius": 2.5 }));

        // A null member does not populate the group.
        let rect = decode_json(&shape, br#"{"circle": null, "rect": {"width": 1, "height": 2}}"#)
            .unwrap();
        assert_eq!(to_value(&rect)["rect"], json!({ "width": 1.0, "height": 2.0 }));
    }

    #[test]
    fn test_oneof_rejects_two_alternatives() {
        let shape = handle("pkg.Shape");

        let err = decode_json(&shape, br#"{"circle": {"radius": 1}, "rect": {"width": 1}}"#)
            .unwrap_err();

        assert!(matches!(
            err,
            CodecError::OneofConflict { ref oneof, ref first, ref second }
                if oneof == "pkg.Shape.kind" && first == "circle" && second == "rect"
        ));
    }

    #[test]
    fn test_oneof_conflicts_are_found_in_nested_messages() {
        let shape = handle("pkg.Shape");

        let in_list = br#"{"children": [{}, {"circle": {}, "rect": {}}]}"#;
        assert!(matches!(
            decode_json(&shape, in_list).unwrap_err(),
            CodecError::OneofConflict { .. }
        ));

        let in_map = br#"{"named": {"a": {"circle": {}, "rect": {}}}}"#;
        assert!(matches!(
            decode_json(&shape, in_map).unwrap_err(),
            CodecError::OneofConflict { .. }
        ));
    }

    #[test]
    fn test_proto3_optional_is_not_a_oneof_group() {
        let shape = handle("pkg.Shape");

        let message = decode_json(&shape, br#"{"note": "hi", "circle": {"radius": 1}}"#).unwrap();
        assert_eq!(to_value(&message)["note"], "hi");
    }

    #[test]
    fn test_transcoding_is_idempotent() {
        let shape = handle("pkg.Shape");
        let input = json!({
            "label": "root",
            "mood": 1,
            "tags": ["a", "b"],
            "rect": { "width": 3.0, "height": 4.0 },
            "serial": "9007199254740993",
            "visible": true,
            "children": [{ "label": "leaf", "circle": { "radius": 1.5 } }],
            "named": { "left": { "label": "l" } },
            "note": "kept"
        });

        let first = decode_value(&shape, input).unwrap();
        let encoded = encode_json(&first).unwrap();
        let second = decode_json(&shape, encoded.as_bytes()).unwrap();

        assert_eq!(to_value(&first), to_value(&second));
        assert_eq!(to_value(&second)["serial"], "9007199254740993");
        assert_eq!(to_value(&second)["children"][0]["label"], "leaf");
    }
}
