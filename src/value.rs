//! Typed value codec: conversion between human input, raw byte patterns,
//! and displayable output, plus the comparison predicates scans run.
//!
//! Rather than repeating a per-variant `match` in parse/render/compare
//! (the shape the original scanner's source used for every operation),
//! each `ValueType` resolves once to a small table of function pointers
//! and every public operation just calls through it.

use crate::error::{Error, Result};

/// Supported scan/read/write value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
}

/// Comparison predicate applied during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Lt,
    Changed,
    Unchanged,
}

impl CompareOp {
    pub fn from_token(token: &str) -> Result<Self> {
        Ok(match token.to_ascii_lowercase().as_str() {
            "exact" | "eq" => CompareOp::Eq,
            "greater" | "gt" => CompareOp::Gt,
            "less" | "lt" => CompareOp::Lt,
            "changed" => CompareOp::Changed,
            "unchanged" => CompareOp::Unchanged,
            _ => return Err(Error::UnknownOp(token.to_string())),
        })
    }

    /// Next-scan may run without a fresh target pattern for these ops.
    pub fn ignores_pattern(self) -> bool {
        matches!(self, CompareOp::Changed | CompareOp::Unchanged)
    }
}

type ParseFn = fn(&str) -> Result<Vec<u8>>;
type RenderFn = fn(&[u8]) -> String;
type NumericCompareFn = fn(&[u8], &[u8], CompareOp) -> Option<bool>;

#[derive(Clone, Copy)]
struct TypeOps {
    width: Option<usize>,
    parse: ParseFn,
    render: RenderFn,
    numeric_compare: NumericCompareFn,
}

impl ValueType {
    pub fn from_token(token: &str) -> Result<Self> {
        Ok(match token.to_ascii_lowercase().as_str() {
            "byte" => ValueType::Byte,
            "short" => ValueType::Short,
            "int" => ValueType::Int,
            "long" => ValueType::Long,
            "float" => ValueType::Float,
            "double" => ValueType::Double,
            "string" => ValueType::String,
            _ => return Err(Error::UnknownType(token.to_string())),
        })
    }

    fn ops(self) -> TypeOps {
        match self {
            ValueType::Byte => TypeOps {
                width: Some(1),
                parse: parse_u8,
                render: render_u8,
                numeric_compare: compare_u8,
            },
            ValueType::Short => TypeOps {
                width: Some(2),
                parse: parse_i16,
                render: render_i16,
                numeric_compare: compare_i16,
            },
            ValueType::Int => TypeOps {
                width: Some(4),
                parse: parse_i32,
                render: render_i32,
                numeric_compare: compare_i32,
            },
            ValueType::Long => TypeOps {
                width: Some(8),
                parse: parse_i64,
                render: render_i64,
                numeric_compare: compare_i64,
            },
            ValueType::Float => TypeOps {
                width: Some(4),
                parse: parse_f32,
                render: render_f32,
                numeric_compare: compare_f32,
            },
            ValueType::Double => TypeOps {
                width: Some(8),
                parse: parse_f64,
                render: render_f64,
                numeric_compare: compare_f64,
            },
            ValueType::String => TypeOps {
                width: None,
                parse: parse_string,
                render: render_string,
                numeric_compare: compare_unsupported,
            },
        }
    }

    /// Fixed byte width, or `None` for `String` (width is the search length).
    pub fn width(self) -> Option<usize> {
        self.ops().width
    }

    /// Stable ordinal used by the save-file format; matches this enum's
    /// declaration order.
    pub fn ordinal(self) -> u8 {
        match self {
            ValueType::Byte => 0,
            ValueType::Short => 1,
            ValueType::Int => 2,
            ValueType::Long => 3,
            ValueType::Float => 4,
            ValueType::Double => 5,
            ValueType::String => 6,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Result<Self> {
        Ok(match ordinal {
            0 => ValueType::Byte,
            1 => ValueType::Short,
            2 => ValueType::Int,
            3 => ValueType::Long,
            4 => ValueType::Float,
            5 => ValueType::Double,
            6 => ValueType::String,
            _ => return Err(Error::UnknownType(ordinal.to_string())),
        })
    }

    /// Parse a human literal into the type's byte pattern.
    pub fn parse(self, literal: &str) -> Result<Vec<u8>> {
        (self.ops().parse)(literal)
    }

    /// Reinterpret a byte pattern as a displayable string.
    pub fn render(self, bytes: &[u8]) -> String {
        (self.ops().render)(bytes)
    }

    /// Whether `Gt`/`Lt` are meaningful for this type. `String` has no
    /// ordering, only (in)equality.
    pub fn supports_ordering(self) -> bool {
        !matches!(self, ValueType::String)
    }

    /// Compare two byte patterns of this type under `op`. `Gt`/`Lt` against
    /// a type with no ordering (currently only `String`) is a diagnosable
    /// failure, not a silent `false`.
    pub fn compare(self, a: &[u8], b: &[u8], op: CompareOp) -> Result<bool> {
        match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Changed => Ok(a != b),
            CompareOp::Unchanged => Ok(a == b),
            CompareOp::Gt | CompareOp::Lt => (self.ops().numeric_compare)(a, b, op)
                .ok_or(Error::UnsupportedOp { op, ty: self }),
        }
    }
}

fn strip_ws(s: &str) -> &str {
    s.trim()
}

fn parse_int_literal<T>(literal: &str, ty: ValueType) -> Result<T>
where
    T: TryFromRadix,
{
    use std::num::IntErrorKind;

    let s = strip_ws(literal);
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };

    T::from_str_radix(digits, radix).map_err(|kind| match kind {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Error::OutOfRange {
            literal: literal.to_string(),
            ty,
        },
        _ => Error::MalformedLiteral {
            literal: literal.to_string(),
            ty,
        },
    })
}

/// Small helper trait so `parse_int_literal` can parse decimal or hex for
/// every integer width while still reporting the precise `IntErrorKind`.
trait TryFromRadix: Sized {
    fn from_str_radix(s: &str, radix: u32) -> std::result::Result<Self, std::num::IntErrorKind>;
}

macro_rules! impl_try_from_radix {
    ($($t:ty),*) => {
        $(impl TryFromRadix for $t {
            fn from_str_radix(s: &str, radix: u32) -> std::result::Result<Self, std::num::IntErrorKind> {
                <$t>::from_str_radix(s, radix).map_err(|e| e.kind().clone())
            }
        })*
    };
}
impl_try_from_radix!(u8, i16, i32, i64);

fn parse_u8(literal: &str) -> Result<Vec<u8>> {
    let v: u8 = parse_int_literal(literal, ValueType::Byte)?;
    Ok(v.to_ne_bytes().to_vec())
}
fn render_u8(bytes: &[u8]) -> String {
    u8::from_ne_bytes([bytes[0]]).to_string()
}
fn compare_u8(a: &[u8], b: &[u8], op: CompareOp) -> Option<bool> {
    let av = u8::from_ne_bytes([a[0]]);
    let bv = u8::from_ne_bytes([b[0]]);
    match op {
        CompareOp::Gt => Some(av > bv),
        CompareOp::Lt => Some(av < bv),
        _ => None,
    }
}

fn parse_i16(literal: &str) -> Result<Vec<u8>> {
    let v: i16 = parse_int_literal(literal, ValueType::Short)?;
    Ok(v.to_ne_bytes().to_vec())
}
fn render_i16(bytes: &[u8]) -> String {
    i16::from_ne_bytes(bytes.try_into().unwrap()).to_string()
}
fn compare_i16(a: &[u8], b: &[u8], op: CompareOp) -> Option<bool> {
    let av = i16::from_ne_bytes(a.try_into().unwrap());
    let bv = i16::from_ne_bytes(b.try_into().unwrap());
    match op {
        CompareOp::Gt => Some(av > bv),
        CompareOp::Lt => Some(av < bv),
        _ => None,
    }
}

fn parse_i32(literal: &str) -> Result<Vec<u8>> {
    let v: i32 = parse_int_literal(literal, ValueType::Int)?;
    Ok(v.to_ne_bytes().to_vec())
}
fn render_i32(bytes: &[u8]) -> String {
    i32::from_ne_bytes(bytes.try_into().unwrap()).to_string()
}
fn compare_i32(a: &[u8], b: &[u8], op: CompareOp) -> Option<bool> {
    let av = i32::from_ne_bytes(a.try_into().unwrap());
    let bv = i32::from_ne_bytes(b.try_into().unwrap());
    match op {
        CompareOp::Gt => Some(av > bv),
        CompareOp::Lt => Some(av < bv),
        _ => None,
    }
}

fn parse_i64(literal: &str) -> Result<Vec<u8>> {
    let v: i64 = parse_int_literal(literal, ValueType::Long)?;
    Ok(v.to_ne_bytes().to_vec())
}
fn render_i64(bytes: &[u8]) -> String {
    i64::from_ne_bytes(bytes.try_into().unwrap()).to_string()
}
fn compare_i64(a: &[u8], b: &[u8], op: CompareOp) -> Option<bool> {
    let av = i64::from_ne_bytes(a.try_into().unwrap());
    let bv = i64::from_ne_bytes(b.try_into().unwrap());
    match op {
        CompareOp::Gt => Some(av > bv),
        CompareOp::Lt => Some(av < bv),
        _ => None,
    }
}

fn parse_f32(literal: &str) -> Result<Vec<u8>> {
    let v: f32 = strip_ws(literal).parse().map_err(|_| Error::MalformedLiteral {
        literal: literal.to_string(),
        ty: ValueType::Float,
    })?;
    Ok(v.to_ne_bytes().to_vec())
}
fn render_f32(bytes: &[u8]) -> String {
    f32::from_ne_bytes(bytes.try_into().unwrap()).to_string()
}
fn compare_f32(a: &[u8], b: &[u8], op: CompareOp) -> Option<bool> {
    let av = f32::from_ne_bytes(a.try_into().unwrap());
    let bv = f32::from_ne_bytes(b.try_into().unwrap());
    match op {
        CompareOp::Gt => Some(av.partial_cmp(&bv) == Some(std::cmp::Ordering::Greater)),
        CompareOp::Lt => Some(av.partial_cmp(&bv) == Some(std::cmp::Ordering::Less)),
        _ => None,
    }
}

fn parse_f64(literal: &str) -> Result<Vec<u8>> {
    let v: f64 = strip_ws(literal).parse().map_err(|_| Error::MalformedLiteral {
        literal: literal.to_string(),
        ty: ValueType::Double,
    })?;
    Ok(v.to_ne_bytes().to_vec())
}
fn render_f64(bytes: &[u8]) -> String {
    f64::from_ne_bytes(bytes.try_into().unwrap()).to_string()
}
fn compare_f64(a: &[u8], b: &[u8], op: CompareOp) -> Option<bool> {
    let av = f64::from_ne_bytes(a.try_into().unwrap());
    let bv = f64::from_ne_bytes(b.try_into().unwrap());
    match op {
        CompareOp::Gt => Some(av.partial_cmp(&bv) == Some(std::cmp::Ordering::Greater)),
        CompareOp::Lt => Some(av.partial_cmp(&bv) == Some(std::cmp::Ordering::Less)),
        _ => None,
    }
}

fn parse_string(literal: &str) -> Result<Vec<u8>> {
    Ok(literal.as_bytes().to_vec())
}
fn render_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
fn compare_unsupported(_a: &[u8], _b: &[u8], _op: CompareOp) -> Option<bool> {
    None
}
