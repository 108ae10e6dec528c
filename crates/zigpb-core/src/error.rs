//! Error types for the zigpb-core library.
//!
//! Every variant is file-scoped and non-retryable: an unsupported schema
//! construct has to be fixed in the schema, not worked around at runtime.

use crate::mapping::{MappingContext, MappingError};
use thiserror::Error;

/// Result type alias for zigpb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for descriptor conversion, mapping and emission
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A field declares map cardinality
    #[error("maps are not supported, field: {field}")]
    MapsNotSupported {
        /// Qualified field name (`Message.field`)
        field: String,
    },

    /// A kind/cardinality combination outside the mapping domain
    #[error("unsupported field kind in {context}: {field} is {kind}")]
    UnsupportedFieldKind {
        /// Qualified field name (`Message.field`)
        field: String,
        /// Declared kind and cardinality, e.g. `repeated int32`
        kind: String,
        /// Which mapper rejected the field
        context: MappingContext,
    },

    /// A message or enum reference that is not declared at the top level of the same file
    #[error("unresolved type reference '{type_name}' in field {field}: referenced types must be declared at the top level of the same file")]
    UnresolvedReference {
        /// Qualified field name (`Message.field`)
        field: String,
        /// The type name as written in the descriptor
        type_name: String,
    },

    /// Field type missing or not a known protobuf type
    #[error("invalid field type {value:?} in field {field}")]
    InvalidFieldType {
        /// Qualified field name (`Message.field`)
        field: String,
        /// Raw type value from the descriptor
        value: Option<i32>,
    },

    /// Invalid field number in descriptor
    #[error("invalid field number {number} in field {field}: must be between 1 and {max}")]
    InvalidFieldNumber {
        /// Qualified field name (`Message.field`)
        field: String,
        /// The invalid field number
        number: i32,
        /// Maximum valid field number
        max: u32,
    },

    /// A declaration whose name collides with one the generated code declares itself
    #[error("reserved name {name}: collides with the generated '{generated}' declaration")]
    ReservedName {
        /// Qualified field name (`Message.field`) or top-level declaration name
        name: String,
        /// The generated declaration it collides with
        generated: &'static str,
    },

    /// A file listed for generation has no descriptor in the request
    #[error("file '{name}' requested for generation but not present in request")]
    MissingFile {
        /// Name of the missing file
        name: String,
    },

    /// Malformed plugin parameter
    #[error("invalid parameter '{parameter}': {details}")]
    InvalidParameter {
        /// The offending `key=value` pair
        parameter: String,
        /// What was wrong with it
        details: String,
    },

    /// Failure while generating one schema file
    #[error("{file}: {source}")]
    File {
        /// Schema file path
        file: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Failed to decode a protobuf message
    #[error("failed to decode protobuf input: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl Error {
    /// Attaches a qualified field name to a mapping failure
    pub fn mapping(field: impl Into<String>, err: MappingError) -> Self {
        let field = field.into();
        match err {
            MappingError::MapsNotSupported => Self::MapsNotSupported { field },
            MappingError::UnsupportedKind {
                kind,
                cardinality,
                context,
            } => Self::UnsupportedFieldKind {
                field,
                kind: cardinality.describe(&kind),
                context,
            },
        }
    }

    /// Creates a new unresolved reference error
    pub fn unresolved_reference(field: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            field: field.into(),
            type_name: type_name.into(),
        }
    }

    /// Creates a new reserved name error
    pub fn reserved_name(name: impl Into<String>, generated: &'static str) -> Self {
        Self::ReservedName {
            name: name.into(),
            generated,
        }
    }

    /// Creates a new invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            details: details.into(),
        }
    }

    /// Wraps an error with the schema file it occurred in
    pub fn in_file(self, file: impl Into<String>) -> Self {
        Self::File {
            file: file.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, unwrapping any file context
    pub fn root(&self) -> &Error {
        match self {
            Self::File { source, .. } => source.root(),
            other => other,
        }
    }
}
