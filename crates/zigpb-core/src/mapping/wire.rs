//! Wire descriptor mapping.
//!
//! Protobuf wire types this layer chooses between:
//! - VARINT: `uint*`, `bool` (plain), `sint*` and enums (zigzag)
//! - I32/I64: `fixed*`, `sfixed*`, `float`, `double`
//! - LEN: `string`, `bytes`, embedded messages, repeated fields

use super::{MappingContext, MappingError};
use crate::descriptor::{Cardinality, FieldKind};
use std::fmt;

/// Varint flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarintEncoding {
    /// Plain base-128 varint
    Simple,
    /// Zigzag-mapped varint, compact for small negative values
    ZigZagOptimized,
}

impl VarintEncoding {
    fn as_str(&self) -> &'static str {
        match self {
            VarintEncoding::Simple => "Simple",
            VarintEncoding::ZigZagOptimized => "ZigZagOptimized",
        }
    }
}

/// Element strategy of a length-delimited list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListElement {
    /// Fixed-width elements; also used for the bytes of `string`/`bytes`
    FixedInt,
    /// Embedded messages
    SubMessage,
    /// Zigzag varints
    ZigZagVarint,
}

/// How the runtime encodes one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireStrategy {
    /// Fixed 32/64-bit value
    FixedWidth,
    /// Varint
    Varint(VarintEncoding),
    /// Length-delimited embedded message
    SubMessage,
    /// Length-delimited run of elements
    List(ListElement),
}

/// Per-field wire metadata: the field number and its strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireDescriptor {
    /// Field number, carried through unchanged
    pub number: u32,
    /// Encoding strategy
    pub strategy: WireStrategy,
}

impl WireDescriptor {
    /// Creates a descriptor
    pub fn new(number: u32, strategy: WireStrategy) -> Self {
        Self { number, strategy }
    }
}

impl fmt::Display for WireDescriptor {
    /// Renders the runtime constructor call, e.g. `fd(3, .{ .Varint = .Simple })`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd({}, ", self.number)?;
        match self.strategy {
            WireStrategy::FixedWidth => f.write_str(".FixedInt")?,
            WireStrategy::Varint(encoding) => write!(f, ".{{ .Varint = .{} }}", encoding.as_str())?,
            WireStrategy::SubMessage => f.write_str(".{ .SubMessage = {} }")?,
            WireStrategy::List(ListElement::FixedInt) => f.write_str(".{ .List = .FixedInt }")?,
            WireStrategy::List(ListElement::SubMessage) => f.write_str(".{ .List = .SubMessage }")?,
            WireStrategy::List(ListElement::ZigZagVarint) => {
                f.write_str(".{ .List = .{ .Varint = .ZigZagOptimized } }")?
            }
        }
        f.write_str(")")
    }
}

/// Maps a field to its wire descriptor.
///
/// Repeated scalar numbers are rejected: the runtime has no packed-scalar list
/// strategy, and falling back to something else would corrupt data.
pub fn map_wire(
    kind: &FieldKind,
    cardinality: Cardinality,
    number: u32,
) -> Result<WireDescriptor, MappingError> {
    let unsupported = || MappingError::unsupported(kind, cardinality, MappingContext::WireMapping);

    let strategy = match cardinality {
        Cardinality::Map => return Err(MappingError::MapsNotSupported),
        Cardinality::Repeated => match kind {
            FieldKind::String | FieldKind::Bytes => WireStrategy::List(ListElement::FixedInt),
            FieldKind::Message(_) => WireStrategy::List(ListElement::SubMessage),
            FieldKind::Enum(_) => WireStrategy::List(ListElement::ZigZagVarint),
            FieldKind::Int32
            | FieldKind::Int64
            | FieldKind::Uint32
            | FieldKind::Uint64
            | FieldKind::Sint32
            | FieldKind::Sint64
            | FieldKind::Fixed32
            | FieldKind::Fixed64
            | FieldKind::Sfixed32
            | FieldKind::Sfixed64
            | FieldKind::Bool
            | FieldKind::Float
            | FieldKind::Double
            | FieldKind::Group(_) => return Err(unsupported()),
        },
        Cardinality::Singular => match kind {
            FieldKind::Fixed32
            | FieldKind::Fixed64
            | FieldKind::Sfixed32
            | FieldKind::Sfixed64
            | FieldKind::Double
            | FieldKind::Float => WireStrategy::FixedWidth,
            FieldKind::Sint32 | FieldKind::Sint64 => WireStrategy::Varint(VarintEncoding::ZigZagOptimized),
            FieldKind::Int32 | FieldKind::Int64 | FieldKind::Uint32 | FieldKind::Uint64 | FieldKind::Bool => {
                WireStrategy::Varint(VarintEncoding::Simple)
            }
            FieldKind::String | FieldKind::Bytes => WireStrategy::List(ListElement::FixedInt),
            FieldKind::Message(_) => WireStrategy::SubMessage,
            FieldKind::Enum(_) => WireStrategy::Varint(VarintEncoding::ZigZagOptimized),
            FieldKind::Group(_) => return Err(unsupported()),
        },
    };

    Ok(WireDescriptor::new(number, strategy))
}
