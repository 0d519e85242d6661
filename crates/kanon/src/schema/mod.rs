//! Structural descriptions of encodable values.
//!
//! There is no interface-description language and no code generation step:
//! a [`StructSchema`] is the wire schema. Field numbers are assigned from
//! declaration order (1-based) and declaration order is never reordered at
//! runtime — reordering fields is a breaking wire change, appending fields
//! is not.

mod plan;
mod value;

use std::sync::Arc;

pub use plan::{FieldPlan, StructPlan};
pub(crate) use plan::{wire_for, PlanCache};
pub use value::{AnyValue, Value};

/// Width designation for integers stored as raw little-endian words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedWidth {
    /// 4 little-endian bytes
    Fixed32,
    /// 8 little-endian bytes
    Fixed64,
}

/// Per-field configuration recognized on a declared field.
///
/// Designations alter omission and validation behavior; they are part of the
/// wire schema, not runtime state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
    /// Emit the field even when its value is the kind's zero value
    pub write_empty: bool,
    /// Forbid nil elements in collections of owned pointers; decode
    /// materializes non-nil zero-valued elements for empty payloads
    pub empty_elements: bool,
    /// Store the integer as a raw fixed-width word instead of a varint
    pub fixed: Option<FixedWidth>,
}

impl FieldOptions {
    /// Creates the default (all designations off) option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `write_empty` designation
    pub fn write_empty(mut self) -> Self {
        self.write_empty = true;
        self
    }

    /// Sets the `empty_elements` designation
    pub fn empty_elements(mut self) -> Self {
        self.empty_elements = true;
        self
    }

    /// Sets a fixed-width storage designation
    pub fn fixed(mut self, width: FixedWidth) -> Self {
        self.fixed = Some(width);
        self
    }
}

/// The structural kind of a field or value.
///
/// `Map`, `Func`, and `Chan` are named so schemas can describe them, but none
/// of the three can ever be serialized: map iteration order is not canonical
/// (touching one aborts, see [`crate::Codec`]), and callable or channel
/// handles have no byte representation (touching one is a recoverable
/// error).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Boolean, varint 0 or 1
    Bool,
    /// Signed 8-bit integer, zigzag varint
    Int8,
    /// Signed 16-bit integer, zigzag varint
    Int16,
    /// Signed 32-bit integer, varint of the two's-complement cast
    Int32,
    /// Signed 64-bit integer, varint of the two's-complement cast
    Int64,
    /// Unsigned 8-bit integer, varint
    Uint8,
    /// Unsigned 16-bit integer, varint
    Uint16,
    /// Unsigned 32-bit integer, varint
    Uint32,
    /// Unsigned 64-bit integer, varint
    Uint64,
    /// 32-bit float, fixed32 bit pattern
    Float32,
    /// 64-bit float, fixed64 bit pattern
    Float64,
    /// UTF-8 string, length-delimited
    String,
    /// Raw byte collection, length-delimited
    Bytes,
    /// Nested struct, length-delimited bare encoding
    Struct(Arc<StructSchema>),
    /// Homogeneous collection, one field entry per element
    List(Box<FieldType>),
    /// Owned pointer; transparent when present, zero-valued when absent
    Optional(Box<FieldType>),
    /// Polymorphic value in the named interface category
    Any(String),
    /// Key/value map — can never be encoded or decoded
    Map(Box<FieldType>, Box<FieldType>),
    /// Callable handle — unsupported, surfaces as a recoverable error
    Func,
    /// Channel handle — unsupported, surfaces as a recoverable error
    Chan,
}

impl FieldType {
    /// Wraps a struct schema as a field type
    pub fn structure(schema: StructSchema) -> Self {
        Self::Struct(Arc::new(schema))
    }

    /// Shorthand for a list of `elem`
    pub fn list(elem: FieldType) -> Self {
        Self::List(Box::new(elem))
    }

    /// Shorthand for an owned pointer to `inner`
    pub fn optional(inner: FieldType) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Shorthand for a polymorphic field in `category`
    pub fn any(category: impl Into<String>) -> Self {
        Self::Any(category.into())
    }

    /// Human-readable kind name, used in mismatch errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Struct(_) => "struct",
            Self::List(_) => "list",
            Self::Optional(_) => "optional",
            Self::Any(_) => "any",
            Self::Map(_, _) => "map",
            Self::Func => "func",
            Self::Chan => "chan",
        }
    }
}

impl From<StructSchema> for FieldType {
    fn from(schema: StructSchema) -> Self {
        Self::structure(schema)
    }
}

/// One declared field of a struct schema
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// Declared field name (diagnostics only; never on the wire)
    pub name: String,
    /// Structural kind of the field
    pub ty: FieldType,
    /// Per-field designations
    pub options: FieldOptions,
}

/// Named, ordered field list describing one struct type.
///
/// The name keys the codec's field-plan cache and must be unique per codec.
#[derive(Debug, Clone, PartialEq)]
pub struct StructSchema {
    /// Unique type name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldSchema>,
}

impl StructSchema {
    /// Creates an empty schema with the given type name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field with default options
    pub fn field(self, name: impl Into<String>, ty: FieldType) -> Self {
        self.field_with(name, ty, FieldOptions::default())
    }

    /// Appends a field with explicit options
    pub fn field_with(
        mut self,
        name: impl Into<String>,
        ty: FieldType,
        options: FieldOptions,
    ) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            ty,
            options,
        });
        self
    }
}
