//! Conversion from `prost_types` descriptors into the descriptor model.

use super::{Cardinality, Enum, EnumValue, Field, FieldKind, Message, SchemaFile};
use crate::error::{Error, Result};
use crate::MAX_FIELD_NUMBER;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use std::collections::HashMap;
use tracing::trace;

impl SchemaFile {
    /// Builds the model for one file of a `CodeGeneratorRequest`.
    ///
    /// Only top-level enums and messages are modelled. Type references must
    /// point at one of those; anything else fails with
    /// [`Error::UnresolvedReference`].
    pub fn from_proto(proto: &FileDescriptorProto) -> Result<Self> {
        let scope = Scope::new(proto);

        let enums = proto.enum_type.iter().map(convert_enum).collect();
        let messages = proto
            .message_type
            .iter()
            .map(|message| convert_message(message, &scope))
            .collect::<Result<Vec<_>>>()?;

        trace!(
            "Converted {}: {} enums, {} messages",
            proto.name(),
            proto.enum_type.len(),
            messages.len()
        );

        Ok(SchemaFile::new(proto.name(), enums, messages))
    }
}

/// Declared top-level types of one file, keyed by fully-qualified name
struct Scope<'a> {
    prefix: String,
    messages: HashMap<String, &'a str>,
    enums: HashMap<String, &'a str>,
}

impl<'a> Scope<'a> {
    fn new(proto: &'a FileDescriptorProto) -> Self {
        let prefix = if proto.package().is_empty() {
            ".".to_string()
        } else {
            format!(".{}.", proto.package())
        };

        let messages = proto
            .message_type
            .iter()
            .map(|m| (format!("{}{}", prefix, m.name()), m.name()))
            .collect();
        let enums = proto
            .enum_type
            .iter()
            .map(|e| (format!("{}{}", prefix, e.name()), e.name()))
            .collect();

        Self {
            prefix,
            messages,
            enums,
        }
    }

    /// Looks a type name up, accepting both `.pkg.Name` and package-relative `Name`
    fn lookup(&self, table: &HashMap<String, &'a str>, type_name: &str) -> Option<&'a str> {
        if type_name.starts_with('.') {
            table.get(type_name).copied()
        } else {
            table.get(&format!("{}{}", self.prefix, type_name)).copied()
        }
    }
}

fn convert_enum(proto: &EnumDescriptorProto) -> Enum {
    Enum {
        name: proto.name().to_string(),
        values: proto
            .value
            .iter()
            .map(|v| EnumValue {
                name: v.name().to_string(),
                number: v.number(),
            })
            .collect(),
    }
}

fn convert_message(proto: &DescriptorProto, scope: &Scope<'_>) -> Result<Message> {
    let fields = proto
        .field
        .iter()
        .map(|field| convert_field(field, proto, scope))
        .collect::<Result<Vec<_>>>()?;

    Ok(Message::new(proto.name(), fields))
}

fn convert_field(
    field: &FieldDescriptorProto,
    message: &DescriptorProto,
    scope: &Scope<'_>,
) -> Result<Field> {
    let qualified = format!("{}.{}", message.name(), field.name());

    let number = field.number();
    if number < 1 || number as u32 > MAX_FIELD_NUMBER {
        return Err(Error::InvalidFieldNumber {
            field: qualified,
            number,
            max: MAX_FIELD_NUMBER,
        });
    }

    let field_type = field
        .r#type
        .and_then(|raw| Type::try_from(raw).ok())
        .ok_or_else(|| Error::InvalidFieldType {
            field: qualified.clone(),
            value: field.r#type,
        })?;

    let cardinality = match field.label() {
        Label::Repeated if is_map_field(field, message) => Cardinality::Map,
        Label::Repeated => Cardinality::Repeated,
        Label::Optional | Label::Required => Cardinality::Singular,
    };

    let kind = match field_type {
        Type::Double => FieldKind::Double,
        Type::Float => FieldKind::Float,
        Type::Int64 => FieldKind::Int64,
        Type::Uint64 => FieldKind::Uint64,
        Type::Int32 => FieldKind::Int32,
        Type::Fixed64 => FieldKind::Fixed64,
        Type::Fixed32 => FieldKind::Fixed32,
        Type::Bool => FieldKind::Bool,
        Type::String => FieldKind::String,
        Type::Bytes => FieldKind::Bytes,
        Type::Uint32 => FieldKind::Uint32,
        Type::Sfixed32 => FieldKind::Sfixed32,
        Type::Sfixed64 => FieldKind::Sfixed64,
        Type::Sint32 => FieldKind::Sint32,
        Type::Sint64 => FieldKind::Sint64,
        Type::Group => FieldKind::Group(simple_name(field.type_name()).to_string()),
        // Map entries are synthetic nested types; the mappers reject the field
        // before the entry name matters.
        Type::Message if cardinality == Cardinality::Map => {
            FieldKind::Message(simple_name(field.type_name()).to_string())
        }
        Type::Message => scope
            .lookup(&scope.messages, field.type_name())
            .map(|name| FieldKind::Message(name.to_string()))
            .ok_or_else(|| Error::unresolved_reference(&qualified, field.type_name()))?,
        Type::Enum => scope
            .lookup(&scope.enums, field.type_name())
            .map(|name| FieldKind::Enum(name.to_string()))
            .ok_or_else(|| Error::unresolved_reference(&qualified, field.type_name()))?,
    };

    Ok(Field {
        name: field.name().to_string(),
        number: number as u32,
        kind,
        cardinality,
    })
}

/// Map fields are repeated fields of a nested, synthetic `map_entry` message
fn is_map_field(field: &FieldDescriptorProto, message: &DescriptorProto) -> bool {
    if field.r#type() != Type::Message {
        return false;
    }

    let type_name = field.type_name();
    message.nested_type.iter().any(|nested| {
        let expected_name = format!(".{}.{}", message.name(), nested.name());
        (type_name.ends_with(&expected_name) || type_name == nested.name())
            && nested
                .options
                .as_ref()
                .map_or(false, |o| o.map_entry.unwrap_or(false))
    })
}

fn simple_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}
