//! Zig unit emission.
//!
//! ## Architecture
//!
//! Emission of one [`SchemaFile`] is handled by [`Emitter`] in two steps:
//!
//! 1. [`Emitter::plan`] runs both mappers over every field and collects the
//!    results into a [`UnitPlan`]. The first failing field aborts the file.
//! 2. [`Emitter::render`] writes the plan out through a [`UnitWriter`]
//!    ([`ZigWriter`] by default). Rendering cannot fail, so a file is either
//!    emitted completely or not at all.
//!
//! The generated message types do no encoding themselves: their `encode`,
//! `decode`, `init` and `deinit` delegate to the runtime module, which reads
//! the per-field `_desc_table`.

mod ident;
mod writer;

use crate::descriptor::{Enum, Message, SchemaFile};
use crate::error::{Error, Result};
use crate::mapping::{map_type_with, map_wire, FieldPresence, TargetType, WireDescriptor};
use tracing::{debug, trace};

pub use ident::escape_identifier;
pub use writer::{StatsWriter, UnitWriter, ZigWriter};
use writer::{header_collision, MESSAGE_MEMBERS};

/// Configuration for Zig emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Indentation string (default: 4 spaces)
    pub indent_str: String,
    /// Import path of the runtime module (default: `protobuf`)
    pub runtime_module: String,
    /// Optional wrapping of fields
    pub presence: FieldPresence,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            indent_str: "    ".to_string(),
            runtime_module: "protobuf".to_string(),
            presence: FieldPresence::AlwaysOptional,
        }
    }
}

impl GeneratorConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    /// Sets the runtime module import path
    pub fn runtime_module(mut self, module: impl Into<String>) -> Self {
        self.runtime_module = module.into();
        self
    }

    /// Sets the field presence mode
    pub fn presence(mut self, presence: FieldPresence) -> Self {
        self.presence = presence;
        self
    }

    /// Parses a plugin parameter string (`--zig_opt=...`).
    ///
    /// Accepts comma-separated `key=value` pairs:
    /// `runtime=<module>`, `presence=optional|bare`, `indent=<spaces>`.
    pub fn from_parameter(parameter: &str) -> Result<Self> {
        let mut config = Self::default();

        for pair in parameter.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(Error::invalid_parameter(pair, "expected key=value"));
            };

            match (key.trim(), value.trim()) {
                ("runtime", "") => return Err(Error::invalid_parameter(pair, "runtime module must not be empty")),
                ("runtime", module) => config.runtime_module = module.to_string(),
                ("presence", "optional") => config.presence = FieldPresence::AlwaysOptional,
                ("presence", "bare") => config.presence = FieldPresence::Bare,
                ("presence", _) => {
                    return Err(Error::invalid_parameter(pair, "presence must be 'optional' or 'bare'"))
                }
                ("indent", width) => match width.parse::<usize>() {
                    Ok(n) if (1..=16).contains(&n) => config.indent_str = " ".repeat(n),
                    _ => return Err(Error::invalid_parameter(pair, "indent must be between 1 and 16")),
                },
                (other, _) => {
                    return Err(Error::invalid_parameter(pair, format!("unknown option '{}'", other)))
                }
            }
        }

        Ok(config)
    }
}

/// One emitted field: its Zig type and wire descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPlan {
    /// Field name
    pub name: String,
    /// Zig type
    pub ty: TargetType,
    /// Runtime wire descriptor
    pub wire: WireDescriptor,
}

/// One emitted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePlan {
    /// Message name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldPlan>,
}

/// Everything needed to render one unit, with all mappings resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPlan {
    /// Generated unit name
    pub name: String,
    /// Source `.proto` path
    pub source: String,
    /// Enums in declaration order
    pub enums: Vec<Enum>,
    /// Messages in declaration order
    pub messages: Vec<MessagePlan>,
}

/// A generated source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// File name, relative to the output root
    pub name: String,
    /// Zig source text
    pub content: String,
}

/// Turns schema files into Zig units
#[derive(Debug, Clone, Default)]
pub struct Emitter {
    config: GeneratorConfig,
}

impl Emitter {
    /// Creates an emitter
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Plans and renders one file
    pub fn emit(&self, file: &SchemaFile) -> Result<Unit> {
        let plan = self.plan(file)?;
        Ok(self.render(&plan))
    }

    /// Resolves every field mapping of a file, failing on the first unsupported field
    pub fn plan(&self, file: &SchemaFile) -> Result<UnitPlan> {
        debug!(
            "Planning {} ({} enums, {} messages)",
            file.unit_name,
            file.enums.len(),
            file.messages.len()
        );

        for enum_type in &file.enums {
            check_top_level_name(&enum_type.name)?;
        }

        let messages = file
            .messages
            .iter()
            .map(|message| self.plan_message(message))
            .collect::<Result<Vec<_>>>()?;

        Ok(UnitPlan {
            name: file.unit_name.clone(),
            source: file.source.clone(),
            enums: file.enums.clone(),
            messages,
        })
    }

    fn plan_message(&self, message: &Message) -> Result<MessagePlan> {
        trace!("Planning message {}", message.name);

        check_top_level_name(&message.name)?;
        for field in &message.fields {
            if let Some(member) = MESSAGE_MEMBERS.into_iter().find(|m| *m == field.name) {
                return Err(Error::reserved_name(message.qualified_field_name(field), member));
            }
        }

        let types = message
            .fields
            .iter()
            .map(|field| {
                map_type_with(&field.kind, field.cardinality, self.config.presence)
                    .map_err(|e| Error::mapping(message.qualified_field_name(field), e))
            })
            .collect::<Result<Vec<_>>>()?;

        let wires = message
            .fields
            .iter()
            .map(|field| {
                map_wire(&field.kind, field.cardinality, field.number)
                    .map_err(|e| Error::mapping(message.qualified_field_name(field), e))
            })
            .collect::<Result<Vec<_>>>()?;

        let fields = message
            .fields
            .iter()
            .zip(types.into_iter().zip(wires))
            .map(|(field, (ty, wire))| FieldPlan {
                name: field.name.clone(),
                ty,
                wire,
            })
            .collect();

        Ok(MessagePlan {
            name: message.name.clone(),
            fields,
        })
    }

    /// Renders a plan as Zig source
    pub fn render(&self, plan: &UnitPlan) -> Unit {
        let mut content = String::new();
        ZigWriter::new(&mut content, &self.config)
            .write_unit(plan)
            .expect("String write cannot fail");

        Unit {
            name: plan.name.clone(),
            content,
        }
    }
}

/// Rejects type names that would be shadowed by, or clash with, generated declarations.
///
/// Escaping does not help here: `@"init"` is still the identifier `init`.
fn check_top_level_name(name: &str) -> Result<()> {
    let generated = header_collision(name).or_else(|| MESSAGE_MEMBERS.into_iter().find(|m| *m == name));
    match generated {
        Some(generated) => Err(Error::reserved_name(name, generated)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Cardinality, Field, FieldKind};
    use crate::mapping::{ListElement, VarintEncoding, WireStrategy};
    use pretty_assertions::assert_eq;

    fn order_file() -> SchemaFile {
        SchemaFile::new(
            "order.proto",
            vec![Enum::new("Status", [("PENDING", 0), ("SHIPPED", 1)])],
            vec![Message::new(
                "Order",
                vec![
                    Field::new("id", 1, FieldKind::Int64),
                    Field::new("tags", 2, FieldKind::String).repeated(),
                    Field::new("status", 3, FieldKind::Enum("Status".into())),
                ],
            )],
        )
    }

    #[test]
    fn test_order_unit() {
        let unit = Emitter::default().emit(&order_file()).unwrap();
        assert_eq!(unit.name, "order.pb.zig");

        let expected = r#"// Code generated by protoc-gen-zig. DO NOT EDIT.
// source: order.proto

const std = @import("std");
const mem = std.mem;
const Allocator = mem.Allocator;
const ArrayList = std.ArrayList;

const protobuf = @import("protobuf");
const FieldDescriptor = protobuf.FieldDescriptor;
const pb_decode = protobuf.pb_decode;
const pb_encode = protobuf.pb_encode;
const pb_deinit = protobuf.pb_deinit;
const pb_init = protobuf.pb_init;
const fd = protobuf.fd;

pub const Status = enum(i32) {
    PENDING = 0,
    SHIPPED = 1,
    _,
};

pub const Order = struct {
    id: ?i64,
    tags: ?ArrayList(u8),
    status: ?Status,

    pub const _desc_table = .{
        .id = fd(1, .{ .Varint = .Simple }),
        .tags = fd(2, .{ .List = .FixedInt }),
        .status = fd(3, .{ .Varint = .ZigZagOptimized }),
    };

    pub fn encode(self: Order, allocator: Allocator) ![]u8 {
        return pb_encode(self, allocator);
    }

    pub fn decode(input: []const u8, allocator: Allocator) !Order {
        return pb_decode(Order, input, allocator);
    }

    pub fn init(allocator: Allocator) Order {
        return pb_init(Order, allocator);
    }

    pub fn deinit(self: Order) void {
        return pb_deinit(self);
    }
};

"#;
        assert_eq!(unit.content, expected);
    }

    #[test]
    fn test_plan_contents() {
        let plan = Emitter::default().plan(&order_file()).unwrap();
        let order = &plan.messages[0];

        assert_eq!(order.fields[0].ty.to_string(), "?i64");
        assert_eq!(order.fields[1].wire.strategy, WireStrategy::List(ListElement::FixedInt));
        assert_eq!(
            order.fields[2].wire.strategy,
            WireStrategy::Varint(VarintEncoding::ZigZagOptimized)
        );
        assert_eq!(plan.enums[0].values.len(), 2);
    }

    #[test]
    fn test_empty_message() {
        let file = SchemaFile::new("empty.proto", vec![], vec![Message::new("Empty", vec![])]);
        let unit = Emitter::default().emit(&file).unwrap();

        assert!(unit.content.contains("pub const Empty = struct {\n    pub const _desc_table = .{};\n"));
        assert!(unit.content.contains("return pb_encode(self, allocator);"));
        assert!(unit.content.contains("return pb_decode(Empty, input, allocator);"));
        assert!(unit.content.contains("return pb_init(Empty, allocator);"));
        assert!(unit.content.contains("return pb_deinit(self);"));
    }

    #[test]
    fn test_declaration_order_preserved() {
        let file = SchemaFile::new(
            "multi.proto",
            vec![Enum::new("B", [("B0", 0)]), Enum::new("A", [("A0", 0)])],
            vec![Message::new("Zed", vec![]), Message::new("Alpha", vec![])],
        );
        let content = Emitter::default().emit(&file).unwrap().content;

        let pos = |needle: &str| content.find(needle).unwrap();
        assert!(pos("pub const B = enum") < pos("pub const A = enum"));
        assert!(pos("pub const A = enum") < pos("pub const Zed = struct"));
        assert!(pos("pub const Zed = struct") < pos("pub const Alpha = struct"));
    }

    #[test]
    fn test_self_reference() {
        let file = SchemaFile::new(
            "tree.proto",
            vec![],
            vec![Message::new(
                "Node",
                vec![
                    Field::new("parent", 1, FieldKind::Message("Node".into())),
                    Field::new("children", 2, FieldKind::Message("Node".into())).repeated(),
                ],
            )],
        );
        let content = Emitter::default().emit(&file).unwrap().content;

        assert!(content.contains("    parent: ?Node,\n"));
        assert!(content.contains("    children: ?ArrayList(Node),\n"));
        assert!(content.contains(".parent = fd(1, .{ .SubMessage = {} }),"));
        assert!(content.contains(".children = fd(2, .{ .List = .SubMessage }),"));
    }

    #[test]
    fn test_failure_aborts_whole_file() {
        let file = SchemaFile::new(
            "bad.proto",
            vec![],
            vec![
                Message::new("Fine", vec![Field::new("ok", 1, FieldKind::Bool)]),
                Message::new(
                    "Broken",
                    vec![
                        Field::new("name", 1, FieldKind::String),
                        Field::new("scores", 2, FieldKind::Sint32).repeated(),
                    ],
                ),
            ],
        );

        let err = Emitter::default().emit(&file).unwrap_err();
        match err {
            Error::UnsupportedFieldKind { field, kind, context } => {
                assert_eq!(field, "Broken.scores");
                assert_eq!(kind, "repeated sint32");
                assert_eq!(context, crate::mapping::MappingContext::WireMapping);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_map_field_fails() {
        let file = SchemaFile::new(
            "map.proto",
            vec![],
            vec![Message::new(
                "Bag",
                vec![Field::new("labels", 1, FieldKind::Message("LabelsEntry".into()))
                    .with_cardinality(Cardinality::Map)],
            )],
        );
        assert!(matches!(
            Emitter::default().plan(&file),
            Err(Error::MapsNotSupported { field }) if field == "Bag.labels"
        ));
    }

    #[test]
    fn test_group_fails_in_type_mapping() {
        let file = SchemaFile::new(
            "legacy.proto",
            vec![],
            vec![Message::new("Old", vec![Field::new("g", 1, FieldKind::Group("G".into()))])],
        );
        assert!(matches!(
            Emitter::default().plan(&file),
            Err(Error::UnsupportedFieldKind { field, context: crate::mapping::MappingContext::TypeMapping, .. })
                if field == "Old.g"
        ));
    }

    #[test]
    fn test_reserved_field_name_fails() {
        let file = SchemaFile::new(
            "e.proto",
            vec![],
            vec![
                Message::new("Fine", vec![Field::new("ok", 1, FieldKind::Bool)]),
                Message::new("Holder", vec![Field::new("init", 1, FieldKind::Bool)]),
            ],
        );
        assert!(matches!(
            Emitter::default().emit(&file),
            Err(Error::ReservedName { name, generated: "init" }) if name == "Holder.init"
        ));

        for member in ["encode", "decode", "deinit", "_desc_table"] {
            let file = SchemaFile::new(
                "e.proto",
                vec![],
                vec![Message::new("Holder", vec![Field::new(member, 1, FieldKind::Bool)])],
            );
            assert!(Emitter::default().plan(&file).is_err(), "accepted field {member}");
        }
    }

    #[test]
    fn test_reserved_type_name_fails() {
        let file = SchemaFile::new(
            "e.proto",
            vec![],
            vec![Message::new("encode", vec![Field::new("id", 1, FieldKind::Uint32)])],
        );
        assert!(matches!(
            Emitter::default().plan(&file),
            Err(Error::ReservedName { name, generated: "encode" }) if name == "encode"
        ));

        let file = SchemaFile::new(
            "e.proto",
            vec![Enum::new("Allocator", [("A", 0)])],
            vec![Message::new("Fine", vec![])],
        );
        assert!(matches!(
            Emitter::default().plan(&file),
            Err(Error::ReservedName { generated: "Allocator", .. })
        ));
    }

    #[test]
    fn test_enum_values_verbatim() {
        let file = SchemaFile::new(
            "code.proto",
            vec![Enum::new("Code", [("NEG", -1), ("BIG", 1000), ("ALIAS", 1000), ("ZERO", 0)])],
            vec![Message::new("Reply", vec![Field::new("code", 1, FieldKind::Enum("Code".into()))])],
        );
        let content = Emitter::default().emit(&file).unwrap().content;

        let expected = r#"pub const Code = enum(i32) {
    NEG = -1,
    BIG = 1000,
    ZERO = 0,
    _,

    pub const ALIAS = Code.BIG;
};
"#;
        assert!(content.contains(expected), "{content}");
        assert!(content.contains("    code: ?Code,\n"));
    }

    #[test]
    fn test_configured_output() {
        let config = GeneratorConfig::new()
            .indent_str("  ")
            .runtime_module("zig-protobuf")
            .presence(FieldPresence::Bare);
        let unit = Emitter::new(config).emit(&order_file()).unwrap();

        assert!(unit.content.contains("const protobuf = @import(\"zig-protobuf\");"));
        assert!(unit.content.contains("\n  id: i64,\n"));
        assert!(unit.content.contains("\n    .tags = fd(2, .{ .List = .FixedInt }),\n"));
    }

    #[test]
    fn test_from_parameter() {
        let config = GeneratorConfig::from_parameter("runtime=pb, presence=bare,indent=2").unwrap();
        assert_eq!(config.runtime_module, "pb");
        assert_eq!(config.presence, FieldPresence::Bare);
        assert_eq!(config.indent_str, "  ");

        assert_eq!(GeneratorConfig::from_parameter("").unwrap(), GeneratorConfig::default());
    }

    #[test]
    fn test_from_parameter_rejects_garbage() {
        for bad in ["runtime", "presence=sometimes", "indent=0", "indent=x", "colour=blue", "runtime="] {
            assert!(
                matches!(GeneratorConfig::from_parameter(bad), Err(Error::InvalidParameter { .. })),
                "accepted {bad}"
            );
        }
    }
}
