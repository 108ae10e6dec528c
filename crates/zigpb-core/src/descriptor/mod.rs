//! Descriptor model.
//!
//! An immutable, read-only view of one schema file: its top-level enums and
//! messages, and for every message field its kind, cardinality and number.
//! The model is built from a `prost_types::FileDescriptorProto` (see
//! [`SchemaFile::from_proto`]) and discarded after a single emission pass.
//!
//! Message references are kept by name only, so self-referential and mutually
//! recursive messages need no special handling.

mod convert;

use std::fmt;

/// Declared kind of a field, independent of its cardinality
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `sint32`
    Sint32,
    /// `sint64`
    Sint64,
    /// `fixed32`
    Fixed32,
    /// `fixed64`
    Fixed64,
    /// `sfixed32`
    Sfixed32,
    /// `sfixed64`
    Sfixed64,
    /// `bool`
    Bool,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// Reference to a message declared in the same file
    Message(String),
    /// Reference to an enum declared in the same file
    Enum(String),
    /// Proto2 group. Never mappable; present so it can be reported precisely.
    Group(String),
}

impl FieldKind {
    /// True for kinds that travel as length-delimited byte runs
    pub fn is_byte_run(&self) -> bool {
        matches!(self, FieldKind::String | FieldKind::Bytes)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Uint32 => "uint32",
            FieldKind::Uint64 => "uint64",
            FieldKind::Sint32 => "sint32",
            FieldKind::Sint64 => "sint64",
            FieldKind::Fixed32 => "fixed32",
            FieldKind::Fixed64 => "fixed64",
            FieldKind::Sfixed32 => "sfixed32",
            FieldKind::Sfixed64 => "sfixed64",
            FieldKind::Bool => "bool",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
            FieldKind::Message(name) => return write!(f, "message {}", name),
            FieldKind::Enum(name) => return write!(f, "enum {}", name),
            FieldKind::Group(name) => return write!(f, "group {}", name),
        };
        f.write_str(name)
    }
}

/// How many values a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// One value
    Singular,
    /// A growable sequence of values
    Repeated,
    /// Key/value collection (unsupported)
    Map,
}

impl Cardinality {
    /// Describes a kind with this cardinality, e.g. `repeated int32`
    pub fn describe(&self, kind: &FieldKind) -> String {
        match self {
            Cardinality::Singular => kind.to_string(),
            Cardinality::Repeated => format!("repeated {}", kind),
            Cardinality::Map => format!("map of {}", kind),
        }
    }
}

/// A message field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name as declared
    pub name: String,
    /// Field number, unique within the message
    pub number: u32,
    /// Declared kind
    pub kind: FieldKind,
    /// Declared cardinality
    pub cardinality: Cardinality,
}

impl Field {
    /// Creates a singular field
    pub fn new(name: impl Into<String>, number: u32, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            number,
            kind,
            cardinality: Cardinality::Singular,
        }
    }

    /// Sets the cardinality
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Marks the field as repeated
    pub fn repeated(self) -> Self {
        self.with_cardinality(Cardinality::Repeated)
    }
}

/// A message type with its fields in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<Field>,
}

impl Message {
    /// Creates a message
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Qualified name of one of this message's fields, for diagnostics
    pub fn qualified_field_name(&self, field: &Field) -> String {
        format!("{}.{}", self.name, field.name)
    }
}

/// A single enum value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    /// Value name, unique within the enum
    pub name: String,
    /// Integer value
    pub number: i32,
}

/// An enum type with its values in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    /// Enum name
    pub name: String,
    /// Values in declaration order
    pub values: Vec<EnumValue>,
}

impl Enum {
    /// Creates an enum from `(name, number)` pairs
    pub fn new<N: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = (N, i32)>) -> Self {
        Self {
            name: name.into(),
            values: values
                .into_iter()
                .map(|(name, number)| EnumValue {
                    name: name.into(),
                    number,
                })
                .collect(),
        }
    }
}

/// One schema file, ready for emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    /// Path of the source `.proto` file
    pub source: String,
    /// Name of the generated unit (`<path>.pb.zig`)
    pub unit_name: String,
    /// Top-level enums in declaration order
    pub enums: Vec<Enum>,
    /// Top-level messages in declaration order
    pub messages: Vec<Message>,
}

impl SchemaFile {
    /// Creates a schema file, deriving the unit name from the source path
    pub fn new(source: impl Into<String>, enums: Vec<Enum>, messages: Vec<Message>) -> Self {
        let source = source.into();
        Self {
            unit_name: unit_name_for(&source),
            source,
            enums,
            messages,
        }
    }
}

/// Generated unit name for a `.proto` path: `a/b/c.proto` -> `a/b/c.pb.zig`
pub fn unit_name_for(source: &str) -> String {
    let stem = source.strip_suffix(".proto").unwrap_or(source);
    format!("{}.pb.zig", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_name_for() {
        assert_eq!(unit_name_for("order.proto"), "order.pb.zig");
        assert_eq!(unit_name_for("shop/v1/order.proto"), "shop/v1/order.pb.zig");
        assert_eq!(unit_name_for("schema"), "schema.pb.zig");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(FieldKind::Sfixed64.to_string(), "sfixed64");
        assert_eq!(FieldKind::Message("Order".into()).to_string(), "message Order");
        assert_eq!(Cardinality::Repeated.describe(&FieldKind::Bool), "repeated bool");
        assert_eq!(Cardinality::Singular.describe(&FieldKind::Bool), "bool");
    }

    #[test]
    fn test_qualified_field_name() {
        let field = Field::new("id", 1, FieldKind::Int64);
        let message = Message::new("Order", vec![field.clone()]);
        assert_eq!(message.qualified_field_name(&field), "Order.id");
    }
}
