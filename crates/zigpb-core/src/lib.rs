//! # zigpb-core
//!
//! A library for turning protobuf schema descriptors into Zig source.
//!
//! For every message field this crate decides two things:
//! - the in-memory Zig type of the field
//! - the wire descriptor a separate Zig runtime needs to encode and decode it
//!
//! The generated code contains no encoding logic of its own; every message
//! delegates `encode`, `decode`, `init` and `deinit` to the runtime.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`descriptor`]: Immutable schema model built from `prost_types` descriptors
//! - [`mapping`]: Type mapper and wire descriptor mapper
//! - [`emit`]: Emission plans and the Zig writer
//! - [`plugin`]: File selection and `protoc` plugin request/response handling
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use prost::Message;
//! use prost_types::compiler::CodeGeneratorRequest;
//! use std::io::Read;
//!
//! let mut input = Vec::new();
//! std::io::stdin().read_to_end(&mut input)?;
//!
//! let request = CodeGeneratorRequest::decode(input.as_slice())?;
//! let response = zigpb_core::generate(&request);
//! for file in &response.file {
//!     println!("{}", file.name());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`UnitWriter`]: Customize how emission plans are written
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod descriptor;
pub mod emit;
pub mod error;
pub mod mapping;
pub mod plugin;

// Re-export primary types for convenience
pub use descriptor::{Cardinality, Enum, EnumValue, Field, FieldKind, Message, SchemaFile};
pub use emit::{Emitter, GeneratorConfig, StatsWriter, Unit, UnitPlan, UnitWriter, ZigWriter};
pub use error::{Error, Result};
pub use mapping::{
    map_type, map_type_with, map_wire, FieldPresence, MappingError, TargetType, WireDescriptor, WireStrategy,
};
pub use plugin::{generate, generate_from_bytes, generate_units, should_emit};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum valid protobuf field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;
