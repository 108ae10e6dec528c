//! Field mapping.
//!
//! Two pure functions over the same input domain:
//!
//! - [`map_type`] decides the in-memory Zig type of a field
//! - [`map_wire`] decides the wire descriptor the runtime needs to encode it
//!
//! Both are exhaustive matches over [`FieldKind`]; any combination outside the
//! supported domain is a [`MappingError`], never a guess.

mod wire;

use crate::descriptor::{Cardinality, FieldKind};
use crate::emit::escape_identifier;
use std::fmt;
use thiserror::Error;

pub use wire::{map_wire, ListElement, VarintEncoding, WireDescriptor, WireStrategy};

/// Which mapper produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingContext {
    /// [`map_type`]
    TypeMapping,
    /// [`map_wire`]
    WireMapping,
}

impl fmt::Display for MappingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingContext::TypeMapping => f.write_str("type mapping"),
            MappingContext::WireMapping => f.write_str("wire descriptor mapping"),
        }
    }
}

/// Failure of a single field mapping
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// Map cardinality, rejected before looking at the kind
    #[error("maps are not supported")]
    MapsNotSupported,

    /// Kind/cardinality combination outside the mapper's domain
    #[error("unsupported field kind in {context}: {}", cardinality.describe(kind))]
    UnsupportedKind {
        /// Declared kind
        kind: FieldKind,
        /// Declared cardinality
        cardinality: Cardinality,
        /// Mapper that rejected it
        context: MappingContext,
    },
}

impl MappingError {
    pub(crate) fn unsupported(kind: &FieldKind, cardinality: Cardinality, context: MappingContext) -> Self {
        Self::UnsupportedKind {
            kind: kind.clone(),
            cardinality,
            context,
        }
    }
}

/// Scalar Zig types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `bool`
    Bool,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `u8`
    U8,
}

impl ScalarType {
    /// Zig spelling of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::U32 => "u32",
            ScalarType::U64 => "u64",
            ScalarType::Bool => "bool",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
            ScalarType::U8 => "u8",
        }
    }
}

/// In-memory type of an emitted field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// A scalar
    Scalar(ScalarType),
    /// `?T`
    Optional(Box<TargetType>),
    /// `ArrayList(T)`
    List(Box<TargetType>),
    /// Another emitted message or enum, by name
    Named(String),
}

impl TargetType {
    /// `ArrayList(u8)`, used for both text and bytes
    pub fn byte_sequence() -> Self {
        TargetType::List(Box::new(TargetType::Scalar(ScalarType::U8)))
    }

    /// Wraps `self` in `?T`
    pub fn optional(self) -> Self {
        TargetType::Optional(Box::new(self))
    }

    /// Wraps `self` in `ArrayList(T)`
    pub fn list(self) -> Self {
        TargetType::List(Box::new(self))
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Scalar(scalar) => f.write_str(scalar.as_str()),
            TargetType::Optional(inner) => write!(f, "?{}", inner),
            TargetType::List(inner) => write!(f, "ArrayList({})", inner),
            TargetType::Named(name) => f.write_str(&escape_identifier(name)),
        }
    }
}

/// Whether emitted fields carry the optional wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldPresence {
    /// Every field is `?T`
    #[default]
    AlwaysOptional,
    /// Fields are emitted without the wrapper
    Bare,
}

/// Maps a field to its Zig type, wrapping every field as optional
pub fn map_type(kind: &FieldKind, cardinality: Cardinality) -> Result<TargetType, MappingError> {
    map_type_with(kind, cardinality, FieldPresence::AlwaysOptional)
}

/// Maps a field to its Zig type with explicit control over the optional wrapper.
///
/// `string` and `bytes` are `ArrayList(u8)` whatever their cardinality: a
/// repeated text field is still one byte sequence, not a list of them.
pub fn map_type_with(
    kind: &FieldKind,
    cardinality: Cardinality,
    presence: FieldPresence,
) -> Result<TargetType, MappingError> {
    if cardinality == Cardinality::Map {
        return Err(MappingError::MapsNotSupported);
    }

    let base = match kind {
        FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => TargetType::Scalar(ScalarType::I32),
        FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => TargetType::Scalar(ScalarType::I64),
        FieldKind::Uint32 | FieldKind::Fixed32 => TargetType::Scalar(ScalarType::U32),
        FieldKind::Uint64 | FieldKind::Fixed64 => TargetType::Scalar(ScalarType::U64),
        FieldKind::Bool => TargetType::Scalar(ScalarType::Bool),
        FieldKind::Double => TargetType::Scalar(ScalarType::F64),
        FieldKind::Float => TargetType::Scalar(ScalarType::F32),
        FieldKind::String | FieldKind::Bytes => TargetType::byte_sequence(),
        FieldKind::Message(name) | FieldKind::Enum(name) => TargetType::Named(name.clone()),
        FieldKind::Group(_) => {
            return Err(MappingError::unsupported(kind, cardinality, MappingContext::TypeMapping))
        }
    };

    let shaped = if cardinality == Cardinality::Repeated && !kind.is_byte_run() {
        base.list()
    } else {
        base
    };

    Ok(match presence {
        FieldPresence::AlwaysOptional => shaped.optional(),
        FieldPresence::Bare => shaped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zig(kind: FieldKind, cardinality: Cardinality) -> String {
        map_type(&kind, cardinality).unwrap().to_string()
    }

    #[test]
    fn test_scalar_widths() {
        assert_eq!(zig(FieldKind::Sint32, Cardinality::Singular), "?i32");
        assert_eq!(zig(FieldKind::Sfixed32, Cardinality::Singular), "?i32");
        assert_eq!(zig(FieldKind::Int64, Cardinality::Singular), "?i64");
        assert_eq!(zig(FieldKind::Sfixed64, Cardinality::Singular), "?i64");
        assert_eq!(zig(FieldKind::Uint32, Cardinality::Singular), "?u32");
        assert_eq!(zig(FieldKind::Fixed32, Cardinality::Singular), "?u32");
        assert_eq!(zig(FieldKind::Uint64, Cardinality::Singular), "?u64");
        assert_eq!(zig(FieldKind::Fixed64, Cardinality::Singular), "?u64");
        assert_eq!(zig(FieldKind::Bool, Cardinality::Singular), "?bool");
        assert_eq!(zig(FieldKind::Float, Cardinality::Singular), "?f32");
        assert_eq!(zig(FieldKind::Double, Cardinality::Singular), "?f64");
    }

    #[test]
    fn test_text_ignores_cardinality() {
        let single = map_type(&FieldKind::String, Cardinality::Singular).unwrap();
        let repeated = map_type(&FieldKind::String, Cardinality::Repeated).unwrap();
        assert_eq!(single, repeated);
        assert_eq!(single.to_string(), "?ArrayList(u8)");
        assert_eq!(zig(FieldKind::Bytes, Cardinality::Repeated), "?ArrayList(u8)");
    }

    #[test]
    fn test_references_and_repeated() {
        let node = FieldKind::Message("Node".into());
        assert_eq!(zig(node.clone(), Cardinality::Singular), "?Node");
        assert_eq!(zig(node, Cardinality::Repeated), "?ArrayList(Node)");
        assert_eq!(zig(FieldKind::Enum("Status".into()), Cardinality::Repeated), "?ArrayList(Status)");
        assert_eq!(zig(FieldKind::Uint32, Cardinality::Repeated), "?ArrayList(u32)");
    }

    #[test]
    fn test_maps_rejected_for_every_kind() {
        for kind in [
            FieldKind::String,
            FieldKind::Int32,
            FieldKind::Message("Entry".into()),
            FieldKind::Group("G".into()),
        ] {
            assert_eq!(map_type(&kind, Cardinality::Map), Err(MappingError::MapsNotSupported));
        }
    }

    #[test]
    fn test_group_rejected() {
        let err = map_type(&FieldKind::Group("Legacy".into()), Cardinality::Singular).unwrap_err();
        assert_eq!(
            err,
            MappingError::UnsupportedKind {
                kind: FieldKind::Group("Legacy".into()),
                cardinality: Cardinality::Singular,
                context: MappingContext::TypeMapping,
            }
        );
    }

    #[test]
    fn test_bare_presence() {
        let ty = map_type_with(&FieldKind::Sint64, Cardinality::Repeated, FieldPresence::Bare).unwrap();
        assert_eq!(ty.to_string(), "ArrayList(i64)");
    }

    #[test]
    fn test_deterministic() {
        let kind = FieldKind::Enum("Status".into());
        assert_eq!(
            map_type(&kind, Cardinality::Repeated),
            map_type(&kind, Cardinality::Repeated)
        );
    }
}
