//! Error types for the kanon codec.
//!
//! Data-dependent failures (truncated input, malformed varints, field-order
//! violations, unsupported kinds) are returned as [`Error`] values through the
//! normal marshal/unmarshal paths. Configuration mistakes — registering a
//! duplicate or colliding type, mutating a sealed registry, touching a
//! map-kinded value — are programmer errors and panic instead.

use thiserror::Error;

use crate::wire::WireType;

/// Result type alias for kanon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable error type for encode and decode operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input ended before a complete value could be read
    #[error("unexpected end of input at offset {offset}")]
    Truncated {
        /// Byte offset where the input ran out
        offset: usize,
    },

    /// Failed to decode a varint
    #[error("failed to decode varint at offset {offset}: buffer too small or invalid encoding")]
    VarintDecode {
        /// Byte offset where the error occurred
        offset: usize,
    },

    /// A decoded integer does not fit the declared field width
    #[error("value {value} overflows {width}")]
    RangeOverflow {
        /// The out-of-range value
        value: i128,
        /// Name of the declared width, e.g. `int8`
        width: &'static str,
    },

    /// Field key carried a wire type this codec does not define
    #[error("unknown wire type: {value}")]
    InvalidWireType {
        /// The raw 3-bit wire type value
        value: u8,
    },

    /// Field number outside the valid range
    #[error("invalid field number {number}: must be between 1 and {max}")]
    InvalidFieldNumber {
        /// The invalid field number
        number: u32,
        /// Maximum valid field number
        max: u32,
    },

    /// A known field arrived with the wrong wire type
    #[error("field '{field}' expects wire type {expected:?} but input carries {got:?}")]
    WireTypeMismatch {
        /// Declared name of the field
        field: String,
        /// Wire type the schema expects
        expected: WireType,
        /// Wire type found in the input
        got: WireType,
    },

    /// Field numbers within a struct must be non-decreasing
    #[error("unexpected field order: field number {number} after {last}")]
    UnexpectedFieldOrder {
        /// The offending field number
        number: u32,
        /// Highest field number already consumed
        last: u32,
    },

    /// Bool fields accept only the canonical encodings 0 and 1
    #[error("invalid bool value {value}: must be 0 or 1")]
    InvalidBool {
        /// The decoded varint value
        value: u64,
    },

    /// String field payload was not valid UTF-8
    #[error("invalid utf-8 in string field: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Outer length prefix disagrees with the available input
    #[error("length prefix declares {declared} bytes but {actual} are available")]
    LengthMismatch {
        /// Length declared by the prefix
        declared: usize,
        /// Bytes actually present after the prefix
        actual: usize,
    },

    /// A delimited region was not fully consumed by its contents
    #[error("trailing bytes: consumed {consumed} of {total} bytes in delimited region")]
    TrailingBytes {
        /// Bytes consumed by decoding
        consumed: usize,
        /// Total bytes in the region
        total: usize,
    },

    /// No concrete type registered under the given prefix bytes
    #[error("no concrete type registered for prefix bytes {prefix:02X?}")]
    UnknownPrefix {
        /// The unresolved prefix bytes
        prefix: [u8; 4],
    },

    /// No concrete type registered under the given disfix bytes
    #[error("no concrete type registered for disamb bytes {disamb:02X?} and prefix bytes {prefix:02X?}")]
    UnknownDisfix {
        /// The unresolved disambiguation bytes
        disamb: [u8; 3],
        /// The unresolved prefix bytes
        prefix: [u8; 4],
    },

    /// Polymorphic field references a category never registered
    #[error("interface category '{category}' is not registered")]
    UnregisteredInterface {
        /// The missing category name
        category: String,
    },

    /// Polymorphic value carries a concrete name never registered
    #[error("concrete type '{name}' is not registered")]
    UnregisteredConcrete {
        /// The missing concrete type name
        name: String,
    },

    /// Kind that this codec cannot serialize
    #[error("cannot encode or decode {kind}-kinded values")]
    UnsupportedKind {
        /// Name of the offending kind
        kind: &'static str,
    },

    /// Value shape does not match the declared schema
    #[error("kind mismatch: schema expects {expected} but value is {got}")]
    KindMismatch {
        /// Kind the schema expects
        expected: &'static str,
        /// Kind the value actually has
        got: &'static str,
    },

    /// Struct value has the wrong number of fields for its schema
    #[error("struct '{schema}' declares {expected} fields but value holds {got}")]
    ArityMismatch {
        /// Name of the struct schema
        schema: String,
        /// Declared field count
        expected: usize,
        /// Field count of the value
        got: usize,
    },

    /// Nil element in a collection that forbids them
    #[error("nil element violates empty_elements invariant in field '{field}'")]
    NilElement {
        /// Declared name of the collection field
        field: String,
    },

    /// Nil value passed to a top-level marshal call
    #[error("cannot marshal a nil top-level value")]
    NilValue,
}

impl Error {
    /// Creates a new truncated-input error
    pub fn truncated(offset: usize) -> Self {
        Self::Truncated { offset }
    }

    /// Creates a new varint decode error
    pub fn varint_decode(offset: usize) -> Self {
        Self::VarintDecode { offset }
    }

    /// Creates a new range overflow error
    pub fn range_overflow(value: impl Into<i128>, width: &'static str) -> Self {
        Self::RangeOverflow {
            value: value.into(),
            width,
        }
    }

    /// Creates a new kind mismatch error
    pub fn kind_mismatch(expected: &'static str, got: &'static str) -> Self {
        Self::KindMismatch { expected, got }
    }

    /// Creates a new unsupported kind error
    pub fn unsupported_kind(kind: &'static str) -> Self {
        Self::UnsupportedKind { kind }
    }

    /// Returns true if this error indicates malformed or truncated input,
    /// as opposed to a schema/value disagreement on the caller's side
    pub fn is_data_error(&self) -> bool {
        !matches!(
            self,
            Self::KindMismatch { .. }
                | Self::ArityMismatch { .. }
                | Self::NilValue
                | Self::NilElement { .. }
                | Self::UnregisteredInterface { .. }
                | Self::UnregisteredConcrete { .. }
        )
    }
}
