//! # kanon
//!
//! A deterministic, reflection-free binary codec with first-class support for
//! polymorphic values.
//!
//! This crate provides:
//! - Varint/zigzag/fixed-width primitive encoders and decoders
//! - A protobuf-compatible wire model (field keys, wire types, skipping)
//! - Structural schemas with per-field designations and memoized field plans
//! - A type registry deriving globally-unique wire tags from registered names
//! - A [`Codec`] facade for bare and length-prefixed marshalling
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`wire`]: Primitive codecs and the field-key wire model
//! - [`schema`]: Structural type descriptions and dynamic values
//! - [`registry`]: Polymorphic type registration and tag derivation
//! - [`codec`]: The reflective engine and the [`Codec`] facade
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use kanon::{Codec, FieldType, StructSchema, Value};
//!
//! let mut cdc = Codec::new();
//! cdc.seal();
//!
//! let schema = StructSchema::new("demo/Pair")
//!     .field("first", FieldType::Int64)
//!     .field("second", FieldType::String);
//! let ty = FieldType::structure(schema);
//!
//! let value = Value::Struct(vec![Value::Int64(42), Value::from("hello")]);
//! let bz = cdc.marshal_binary_bare(&ty, &value)?;
//!
//! let mut decoded = Value::Bool(false);
//! cdc.unmarshal_binary_bare(&ty, &bz, &mut decoded)?;
//! assert_eq!(decoded, value);
//! # Ok::<(), kanon::Error>(())
//! ```
//!
//! ## Determinism
//!
//! Equal values always produce equal bytes: struct fields encode strictly in
//! declaration order, zero values are omitted, and map-kinded values (whose
//! iteration order is not canonical) are rejected outright.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codec;
pub mod error;
pub mod registry;
pub mod schema;
pub mod wire;

// Re-export primary types for convenience
pub use codec::{Codec, EncodingMode};
pub use error::{Error, Result};
pub use registry::{name_to_disfix, Registry, TypeDescriptor};
pub use schema::{
    AnyValue, FieldOptions, FieldSchema, FieldType, FixedWidth, StructSchema, Value,
};
pub use wire::{WireType, MAX_FIELD_NUMBER};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
