//! Dynamic value tree mirroring [`FieldType`].

use super::{FieldType, StructSchema};

/// A polymorphic value: the registered concrete name plus the concrete value
#[derive(Debug, Clone, PartialEq)]
pub struct AnyValue {
    /// Registered name of the concrete type
    pub name: String,
    /// The concrete value
    pub value: Box<Value>,
}

/// A dynamic value, one variant per structural kind.
///
/// `Map`, `Func`, and `Chan` values can be constructed and carried around but
/// never serialized; see [`FieldType`] for the abort-vs-error split.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// Signed 8-bit integer
    Int8(i8),
    /// Signed 16-bit integer
    Int16(i16),
    /// Signed 32-bit integer
    Int32(i32),
    /// Signed 64-bit integer
    Int64(i64),
    /// Unsigned 8-bit integer
    Uint8(u8),
    /// Unsigned 16-bit integer
    Uint16(u16),
    /// Unsigned 32-bit integer
    Uint32(u32),
    /// Unsigned 64-bit integer
    Uint64(u64),
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
    /// UTF-8 string
    String(String),
    /// Raw byte collection
    Bytes(Vec<u8>),
    /// Struct value: one entry per declared field, in declaration order
    Struct(Vec<Value>),
    /// Homogeneous collection
    List(Vec<Value>),
    /// Owned pointer, `None` when nil
    Optional(Option<Box<Value>>),
    /// Polymorphic value, `None` when nil
    Any(Option<AnyValue>),
    /// Key/value map — never serializable
    Map(Vec<(Value, Value)>),
    /// Callable handle — never serializable
    Func,
    /// Channel handle — never serializable
    Chan,
}

impl Value {
    /// The zero value of a kind: what decoding restores for unseen fields.
    pub fn zero_of(ty: &FieldType) -> Value {
        match ty {
            FieldType::Bool => Value::Bool(false),
            FieldType::Int8 => Value::Int8(0),
            FieldType::Int16 => Value::Int16(0),
            FieldType::Int32 => Value::Int32(0),
            FieldType::Int64 => Value::Int64(0),
            FieldType::Uint8 => Value::Uint8(0),
            FieldType::Uint16 => Value::Uint16(0),
            FieldType::Uint32 => Value::Uint32(0),
            FieldType::Uint64 => Value::Uint64(0),
            FieldType::Float32 => Value::Float32(0.0),
            FieldType::Float64 => Value::Float64(0.0),
            FieldType::String => Value::String(String::new()),
            FieldType::Bytes => Value::Bytes(Vec::new()),
            FieldType::Struct(schema) => Value::zero_struct(schema),
            FieldType::List(_) => Value::List(Vec::new()),
            FieldType::Optional(_) => Value::Optional(None),
            FieldType::Any(_) => Value::Any(None),
            FieldType::Map(_, _) => Value::Map(Vec::new()),
            FieldType::Func => Value::Func,
            FieldType::Chan => Value::Chan,
        }
    }

    /// A struct value with every field at its zero value
    pub fn zero_struct(schema: &StructSchema) -> Value {
        Value::Struct(
            schema
                .fields
                .iter()
                .map(|f| Value::zero_of(&f.ty))
                .collect(),
        )
    }

    /// Whether this value equals its kind's zero value.
    ///
    /// A nil pointer and a pointer to a zero value are both zero; an absent
    /// collection and an allocated empty one are both zero. Floats are zero
    /// only on an exactly-zero bit pattern, so `-0.0` is not omitted and
    /// survives round trips. `Map`/`Func`/`Chan` report non-zero so they can
    /// never be silently dropped instead of rejected.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Bool(b) => !b,
            Value::Int8(x) => *x == 0,
            Value::Int16(x) => *x == 0,
            Value::Int32(x) => *x == 0,
            Value::Int64(x) => *x == 0,
            Value::Uint8(x) => *x == 0,
            Value::Uint16(x) => *x == 0,
            Value::Uint32(x) => *x == 0,
            Value::Uint64(x) => *x == 0,
            Value::Float32(f) => f.to_bits() == 0,
            Value::Float64(f) => f.to_bits() == 0,
            Value::String(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Struct(fields) => fields.iter().all(Value::is_zero),
            Value::List(items) => items.is_empty(),
            Value::Optional(inner) => match inner {
                None => true,
                Some(v) => v.is_zero(),
            },
            Value::Any(inner) => inner.is_none(),
            Value::Map(_) | Value::Func | Value::Chan => false,
        }
    }

    /// Human-readable kind name, used in mismatch errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Uint8(_) => "uint8",
            Value::Uint16(_) => "uint16",
            Value::Uint32(_) => "uint32",
            Value::Uint64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Struct(_) => "struct",
            Value::List(_) => "list",
            Value::Optional(_) => "optional",
            Value::Any(_) => "any",
            Value::Map(_) => "map",
            Value::Func => "func",
            Value::Chan => "chan",
        }
    }

    /// A present pointer
    pub fn some(v: Value) -> Value {
        Value::Optional(Some(Box::new(v)))
    }

    /// A nil pointer
    pub fn none() -> Value {
        Value::Optional(None)
    }

    /// A present polymorphic value with its registered concrete name
    pub fn any(name: impl Into<String>, v: Value) -> Value {
        Value::Any(Some(AnyValue {
            name: name.into(),
            value: Box::new(v),
        }))
    }

    /// A nil polymorphic value
    pub fn nil_any() -> Value {
        Value::Any(None)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Int8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Uint8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Uint16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert!(Value::zero_of(&FieldType::Int64).is_zero());
        assert!(Value::zero_of(&FieldType::String).is_zero());
        assert!(Value::zero_of(&FieldType::list(FieldType::Bool)).is_zero());
        assert!(Value::zero_of(&FieldType::optional(FieldType::Bytes)).is_zero());
        assert!(Value::zero_of(&FieldType::any("Cat")).is_zero());
        assert!(!Value::Int64(1).is_zero());
    }

    #[test]
    fn test_nil_and_zero_pointer_both_zero() {
        let schema = StructSchema::new("Inner").field("val", FieldType::Int64);
        assert!(Value::none().is_zero());
        assert!(Value::some(Value::zero_struct(&schema)).is_zero());
        assert!(!Value::some(Value::Struct(vec![Value::Int64(3)])).is_zero());
    }

    #[test]
    fn test_negative_zero_float_is_not_zero() {
        assert!(Value::Float64(0.0).is_zero());
        assert!(!Value::Float64(-0.0).is_zero());
        assert!(!Value::Float32(-0.0).is_zero());
    }

    #[test]
    fn test_unserializable_kinds_never_zero() {
        assert!(!Value::Map(Vec::new()).is_zero());
        assert!(!Value::Func.is_zero());
        assert!(!Value::Chan.is_zero());
    }
}
