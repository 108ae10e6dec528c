//! Zig identifier escaping.

use std::borrow::Cow;

const ZIG_KEYWORDS: &[&str] = &[
    "addrspace", "align", "allowzero", "and", "anyframe", "anytype", "asm", "async", "await",
    "break", "callconv", "catch", "comptime", "const", "continue", "defer", "else", "enum",
    "errdefer", "error", "export", "extern", "fn", "for", "if", "inline", "linksection",
    "noalias", "noinline", "nosuspend", "opaque", "or", "orelse", "packed", "pub", "resume",
    "return", "struct", "suspend", "switch", "test", "threadlocal", "try", "union",
    "unreachable", "usingnamespace", "var", "volatile", "while",
];

const ZIG_PRIMITIVES: &[&str] = &[
    "anyerror", "anyopaque", "bool", "comptime_float", "comptime_int", "f16", "f32", "f64",
    "f80", "f128", "false", "isize", "noreturn", "null", "true", "type", "undefined", "usize",
    "void", "c_char", "c_short", "c_ushort", "c_int", "c_uint", "c_long", "c_ulong",
    "c_longlong", "c_ulonglong", "c_longdouble",
];

/// Returns `name` as a Zig identifier, using `@"name"` when it is a keyword,
/// shadows a primitive, or is not a plain identifier.
pub fn escape_identifier(name: &str) -> Cow<'_, str> {
    if is_plain_identifier(name) && !is_reserved(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("@\"{}\"", name))
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_reserved(name: &str) -> bool {
    name == "_"
        || ZIG_KEYWORDS.contains(&name)
        || ZIG_PRIMITIVES.contains(&name)
        || is_sized_integer(name)
}

/// `i7`, `u64` and friends are primitive types in Zig
fn is_sized_integer(name: &str) -> bool {
    let Some(digits) = name.strip_prefix('i').or_else(|| name.strip_prefix('u')) else {
        return false;
    };
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
