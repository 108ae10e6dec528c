//! Extensible unit writing.
//!
//! This module provides the [`UnitWriter`] trait for customizing how a
//! [`UnitPlan`] is written out, plus the default Zig implementation.

use super::{escape_identifier, GeneratorConfig, MessagePlan, UnitPlan};
use crate::descriptor::{Enum, EnumValue};
use std::collections::HashMap;
use std::fmt::{Result, Write};

/// Runtime symbols re-exported at the top of every unit
const RUNTIME_SYMBOLS: [&str; 6] = ["FieldDescriptor", "pb_decode", "pb_encode", "pb_deinit", "pb_init", "fd"];

/// Declarations every message struct receives besides its fields
pub(super) const MESSAGE_MEMBERS: [&str; 5] = ["_desc_table", "encode", "decode", "init", "deinit"];

/// Returns the header declaration a top-level name would collide with
pub(super) fn header_collision(name: &str) -> Option<&'static str> {
    ["std", "mem", "Allocator", "ArrayList", "protobuf"]
        .into_iter()
        .chain(RUNTIME_SYMBOLS)
        .find(|decl| *decl == name)
}

/// Trait for writing the parts of a unit.
///
/// Every method defaults to a no-op, so implementations only override what
/// they care about. [`UnitWriter::write_unit`] drives the calls in emission
/// order: header, enums, then messages.
pub trait UnitWriter {
    /// Write the header and runtime imports
    fn write_header(&mut self, plan: &UnitPlan) -> Result {
        let _ = plan;
        Ok(())
    }

    /// Write an enum definition
    fn write_enum(&mut self, enum_type: &Enum) -> Result {
        let _ = enum_type;
        Ok(())
    }

    /// Write a message definition with its descriptor table and operations
    fn write_message(&mut self, message: &MessagePlan) -> Result {
        let _ = message;
        Ok(())
    }

    /// Write a whole unit
    fn write_unit(&mut self, plan: &UnitPlan) -> Result {
        self.write_header(plan)?;
        for enum_type in &plan.enums {
            self.write_enum(enum_type)?;
        }
        for message in &plan.messages {
            self.write_message(message)?;
        }
        Ok(())
    }
}

/// A writer that collects statistics about the emitted units
#[derive(Debug, Default)]
pub struct StatsWriter {
    /// Number of units
    pub unit_count: usize,
    /// Number of enums
    pub enum_count: usize,
    /// Number of messages
    pub message_count: usize,
    /// Number of fields
    pub field_count: usize,
}

impl UnitWriter for StatsWriter {
    fn write_header(&mut self, _plan: &UnitPlan) -> Result {
        self.unit_count += 1;
        Ok(())
    }

    fn write_enum(&mut self, _enum_type: &Enum) -> Result {
        self.enum_count += 1;
        Ok(())
    }

    fn write_message(&mut self, message: &MessagePlan) -> Result {
        self.message_count += 1;
        self.field_count += message.fields.len();
        Ok(())
    }
}

/// Writes Zig source
pub struct ZigWriter<'a, W: Write> {
    writer: &'a mut W,
    config: &'a GeneratorConfig,
    indent_level: usize,
}

impl<'a, W: Write> ZigWriter<'a, W> {
    /// Creates a writer over `writer`
    pub fn new(writer: &'a mut W, config: &'a GeneratorConfig) -> Self {
        Self {
            writer,
            config,
            indent_level: 0,
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) -> Result {
        for _ in 0..self.indent_level {
            write!(self.writer, "{}", self.config.indent_str)?;
        }
        Ok(())
    }

    fn writeln(&mut self, s: &str) -> Result {
        if s.is_empty() {
            return writeln!(self.writer);
        }
        self.write_indent()?;
        writeln!(self.writer, "{}", s)
    }

    fn write_desc_table(&mut self, message: &MessagePlan) -> Result {
        if message.fields.is_empty() {
            return self.writeln("pub const _desc_table = .{};");
        }

        self.writeln("pub const _desc_table = .{")?;
        self.indent();
        for field in &message.fields {
            self.write_indent()?;
            writeln!(self.writer, ".{} = {},", escape_identifier(&field.name), field.wire)?;
        }
        self.dedent();
        self.writeln("};")
    }

    fn write_operations(&mut self, name: &str) -> Result {
        self.writeln("")?;
        self.writeln(&format!("pub fn encode(self: {}, allocator: Allocator) ![]u8 {{", name))?;
        self.indent();
        self.writeln("return pb_encode(self, allocator);")?;
        self.dedent();
        self.writeln("}")?;

        self.writeln("")?;
        self.writeln(&format!("pub fn decode(input: []const u8, allocator: Allocator) !{} {{", name))?;
        self.indent();
        self.writeln(&format!("return pb_decode({}, input, allocator);", name))?;
        self.dedent();
        self.writeln("}")?;

        self.writeln("")?;
        self.writeln(&format!("pub fn init(allocator: Allocator) {} {{", name))?;
        self.indent();
        self.writeln(&format!("return pb_init({}, allocator);", name))?;
        self.dedent();
        self.writeln("}")?;

        self.writeln("")?;
        self.writeln(&format!("pub fn deinit(self: {}) void {{", name))?;
        self.indent();
        self.writeln("return pb_deinit(self);")?;
        self.dedent();
        self.writeln("}")
    }
}

impl<W: Write> UnitWriter for ZigWriter<'_, W> {
    fn write_header(&mut self, plan: &UnitPlan) -> Result {
        writeln!(self.writer, "// Code generated by protoc-gen-zig. DO NOT EDIT.")?;
        writeln!(self.writer, "// source: {}", plan.source)?;
        writeln!(self.writer)?;

        writeln!(self.writer, "const std = @import(\"std\");")?;
        writeln!(self.writer, "const mem = std.mem;")?;
        writeln!(self.writer, "const Allocator = mem.Allocator;")?;
        writeln!(self.writer, "const ArrayList = std.ArrayList;")?;
        writeln!(self.writer)?;

        writeln!(self.writer, "const protobuf = @import(\"{}\");", self.config.runtime_module)?;
        for symbol in RUNTIME_SYMBOLS {
            writeln!(self.writer, "const {} = protobuf.{};", symbol, symbol)?;
        }
        writeln!(self.writer)
    }

    fn write_enum(&mut self, enum_type: &Enum) -> Result {
        let name = escape_identifier(&enum_type.name);
        writeln!(self.writer, "pub const {} = enum(i32) {{", name)?;
        self.indent();

        // Zig tags must be unique, so later names for a value become aliases of the first
        let mut tags: HashMap<i32, &EnumValue> = HashMap::new();
        let mut aliases = Vec::new();
        for value in &enum_type.values {
            if let Some(tag) = tags.get(&value.number) {
                aliases.push((value, *tag));
                continue;
            }
            tags.insert(value.number, value);
            self.write_indent()?;
            writeln!(self.writer, "{} = {},", escape_identifier(&value.name), value.number)?;
        }
        // Catch-all so unknown wire values survive a decode/encode round trip
        self.writeln("_,")?;

        if !aliases.is_empty() {
            self.writeln("")?;
        }
        for (alias, tag) in aliases {
            self.write_indent()?;
            writeln!(
                self.writer,
                "pub const {} = {}.{};",
                escape_identifier(&alias.name),
                name,
                escape_identifier(&tag.name)
            )?;
        }

        self.dedent();
        writeln!(self.writer, "}};")?;
        writeln!(self.writer)
    }

    fn write_message(&mut self, message: &MessagePlan) -> Result {
        let name = escape_identifier(&message.name);
        writeln!(self.writer, "pub const {} = struct {{", name)?;
        self.indent();

        for field in &message.fields {
            self.write_indent()?;
            writeln!(self.writer, "{}: {},", escape_identifier(&field.name), field.ty)?;
        }
        if !message.fields.is_empty() {
            self.writeln("")?;
        }

        self.write_desc_table(message)?;
        self.write_operations(&name)?;

        self.dedent();
        writeln!(self.writer, "}};")?;
        writeln!(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::FieldPlan;
    use crate::mapping::{TargetType, WireDescriptor, WireStrategy};

    fn plan() -> UnitPlan {
        UnitPlan {
            name: "kw.pb.zig".to_string(),
            source: "kw.proto".to_string(),
            enums: vec![Enum::new("Kind", [("null", 0), ("VALUE", 3)])],
            messages: vec![MessagePlan {
                name: "Holder".to_string(),
                fields: vec![FieldPlan {
                    name: "type".to_string(),
                    ty: TargetType::Named("Kind".to_string()).optional(),
                    wire: WireDescriptor::new(1, WireStrategy::FixedWidth),
                }],
            }],
        }
    }

    #[test]
    fn test_stats_writer() {
        let mut writer = StatsWriter::default();
        writer.write_unit(&plan()).unwrap();
        writer.write_unit(&plan()).unwrap();

        assert_eq!(writer.unit_count, 2);
        assert_eq!(writer.enum_count, 2);
        assert_eq!(writer.message_count, 2);
        assert_eq!(writer.field_count, 2);
    }

    #[test]
    fn test_keywords_escaped() {
        let config = GeneratorConfig::default();
        let mut out = String::new();
        ZigWriter::new(&mut out, &config).write_unit(&plan()).unwrap();

        assert!(out.contains("    @\"null\" = 0,\n    VALUE = 3,\n    _,\n"));
        assert!(out.contains("    @\"type\": ?Kind,\n"));
        assert!(out.contains("        .@\"type\" = fd(1, .FixedInt),\n"));
    }

    #[test]
    fn test_enum_aliases() {
        let mut plan = plan();
        plan.enums = vec![Enum::new("Level", [("LOW", 0), ("MIN", 0), ("HIGH", 2), ("MAX", 2)])];
        let config = GeneratorConfig::default();
        let mut out = String::new();
        ZigWriter::new(&mut out, &config).write_unit(&plan).unwrap();

        assert!(out.contains(
            "pub const Level = enum(i32) {\n    LOW = 0,\n    HIGH = 2,\n    _,\n\n    pub const MIN = Level.LOW;\n    pub const MAX = Level.HIGH;\n};\n"
        ));
    }

    #[test]
    fn test_header_collision() {
        assert_eq!(header_collision("Allocator"), Some("Allocator"));
        assert_eq!(header_collision("fd"), Some("fd"));
        assert_eq!(header_collision("Order"), None);
    }
}
