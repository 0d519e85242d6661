//! Codec facade: registry plus the reflective encode/decode engine.
//!
//! A [`Codec`] is configured once (register interface categories and concrete
//! types, then [`Codec::seal`]) and used concurrently afterwards: all marshal
//! and unmarshal entry points take `&self`.

mod decode;
mod encode;

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::schema::{FieldType, PlanCache, StructPlan, StructSchema, Value};
use crate::wire::primitive::{decode_uvarint, encode_uvarint};

/// Outer framing of a marshalled value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMode {
    /// The value's bytes with no outer framing
    Bare,
    /// The bare bytes preceded by their uvarint byte length
    LengthPrefixed,
}

/// Serializer/deserializer with an owned type registry.
///
/// Registration takes `&mut self` and panics on configuration mistakes;
/// marshalling takes `&self` and returns recoverable [`Error`]s for anything
/// data-dependent. Touching a map-kinded schema or value panics on both
/// paths, because map iteration order would silently break the determinism
/// guarantee.
#[derive(Debug, Default)]
pub struct Codec {
    registry: Registry,
    plans: PlanCache,
}

impl Codec {
    /// Creates a codec with an empty, unsealed registry
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            plans: PlanCache::new(),
        }
    }

    /// Declares a polymorphic interface category.
    ///
    /// # Panics
    ///
    /// Panics if the registry is sealed or the category already exists.
    pub fn register_interface(&mut self, category: &str) {
        self.registry.register_interface(category);
    }

    /// Registers a concrete type under a globally-unique name.
    ///
    /// # Panics
    ///
    /// Panics if the registry is sealed, the name is taken, or the derived
    /// prefix bytes collide with an already-registered type.
    pub fn register_concrete(&mut self, name: &str, ty: FieldType) {
        self.registry.register_concrete(name, ty);
    }

    /// Freezes the registry; idempotent and one-way
    pub fn seal(&mut self) {
        self.registry.seal();
    }

    /// The codec's registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn plan_for(&self, schema: &StructSchema) -> Result<Arc<StructPlan>> {
        self.plans.plan_for(schema)
    }

    /// Marshal a value under the given framing mode.
    pub fn marshal_binary(
        &self,
        ty: &FieldType,
        value: &Value,
        mode: EncodingMode,
    ) -> Result<Vec<u8>> {
        let (ty, value) = normalize(ty, value)?;
        let mut buf = Vec::new();
        encode::encode_toplevel(self, ty, value, &mut buf)?;
        match mode {
            EncodingMode::Bare => Ok(buf),
            EncodingMode::LengthPrefixed => {
                let mut framed = Vec::with_capacity(buf.len() + 5);
                encode_uvarint(&mut framed, buf.len() as u64);
                framed.extend_from_slice(&buf);
                Ok(framed)
            }
        }
    }

    /// Marshal a value with no outer framing
    pub fn marshal_binary_bare(&self, ty: &FieldType, value: &Value) -> Result<Vec<u8>> {
        self.marshal_binary(ty, value, EncodingMode::Bare)
    }

    /// Marshal a value preceded by its uvarint byte length
    pub fn marshal_binary_length_prefixed(
        &self,
        ty: &FieldType,
        value: &Value,
    ) -> Result<Vec<u8>> {
        self.marshal_binary(ty, value, EncodingMode::LengthPrefixed)
    }

    /// Unmarshal a value under the given framing mode.
    ///
    /// The destination is reshaped to the schema's zero value when its kind
    /// does not match; on error, fields decoded before the failure remain
    /// observable in the destination.
    pub fn unmarshal_binary(
        &self,
        ty: &FieldType,
        bz: &[u8],
        dest: &mut Value,
        mode: EncodingMode,
    ) -> Result<()> {
        let bz = match mode {
            EncodingMode::Bare => bz,
            EncodingMode::LengthPrefixed => {
                let (declared, n) = decode_uvarint(bz)?;
                let rest = &bz[n..];
                let declared = declared as usize;
                if declared > rest.len() {
                    return Err(Error::LengthMismatch {
                        declared,
                        actual: rest.len(),
                    });
                }
                if declared < rest.len() {
                    return Err(Error::TrailingBytes {
                        consumed: n + declared,
                        total: bz.len(),
                    });
                }
                rest
            }
        };
        let slot = dest_slot(ty, dest);
        let (inner_ty, slot) = slot;
        let n = decode::decode_toplevel(self, inner_ty, bz, slot)?;
        if n != bz.len() {
            return Err(Error::TrailingBytes {
                consumed: n,
                total: bz.len(),
            });
        }
        debug!(bytes = bz.len(), "unmarshalled value");
        Ok(())
    }

    /// Unmarshal bytes with no outer framing
    pub fn unmarshal_binary_bare(
        &self,
        ty: &FieldType,
        bz: &[u8],
        dest: &mut Value,
    ) -> Result<()> {
        self.unmarshal_binary(ty, bz, dest, EncodingMode::Bare)
    }

    /// Unmarshal bytes preceded by their uvarint byte length
    pub fn unmarshal_binary_length_prefixed(
        &self,
        ty: &FieldType,
        bz: &[u8],
        dest: &mut Value,
    ) -> Result<()> {
        self.unmarshal_binary(ty, bz, dest, EncodingMode::LengthPrefixed)
    }

    /// Like [`Codec::marshal_binary_bare`] but panics on error
    pub fn must_marshal_binary_bare(&self, ty: &FieldType, value: &Value) -> Vec<u8> {
        match self.marshal_binary_bare(ty, value) {
            Ok(bz) => bz,
            Err(e) => panic!("must_marshal_binary_bare: {e}"),
        }
    }

    /// Like [`Codec::marshal_binary_length_prefixed`] but panics on error
    pub fn must_marshal_binary_length_prefixed(&self, ty: &FieldType, value: &Value) -> Vec<u8> {
        match self.marshal_binary_length_prefixed(ty, value) {
            Ok(bz) => bz,
            Err(e) => panic!("must_marshal_binary_length_prefixed: {e}"),
        }
    }

    /// Like [`Codec::unmarshal_binary_bare`] but panics on error
    pub fn must_unmarshal_binary_bare(&self, ty: &FieldType, bz: &[u8], dest: &mut Value) {
        if let Err(e) = self.unmarshal_binary_bare(ty, bz, dest) {
            panic!("must_unmarshal_binary_bare: {e}");
        }
    }

    /// Like [`Codec::unmarshal_binary_length_prefixed`] but panics on error
    pub fn must_unmarshal_binary_length_prefixed(
        &self,
        ty: &FieldType,
        bz: &[u8],
        dest: &mut Value,
    ) {
        if let Err(e) = self.unmarshal_binary_length_prefixed(ty, bz, dest) {
            panic!("must_unmarshal_binary_length_prefixed: {e}");
        }
    }
}

/// Unwrap top-level pointer indirections in lock-step with the schema.
///
/// Any number of `Optional` layers is transparent; a nil anywhere in the
/// chain makes the value unmarshallable.
fn normalize<'a>(mut ty: &'a FieldType, mut value: &'a Value) -> Result<(&'a FieldType, &'a Value)> {
    loop {
        match (ty, value) {
            (FieldType::Optional(inner_ty), Value::Optional(Some(inner))) => {
                ty = inner_ty;
                value = inner;
            }
            (FieldType::Optional(_), Value::Optional(None)) => return Err(Error::NilValue),
            (FieldType::Optional(_), _) => {
                return Err(Error::kind_mismatch("optional", value.kind_name()))
            }
            _ => return Ok((ty, value)),
        }
    }
}

/// Navigate the destination through top-level pointer indirections,
/// allocating pointees as needed, and return the slot the bare value
/// decodes into.
fn dest_slot<'a>(mut ty: &'a FieldType, mut dest: &'a mut Value) -> (&'a FieldType, &'a mut Value) {
    loop {
        match ty {
            FieldType::Optional(inner_ty) => {
                if !matches!(dest, Value::Optional(_)) {
                    *dest = Value::Optional(None);
                }
                let Value::Optional(inner) = dest else {
                    unreachable!()
                };
                ty = inner_ty;
                dest = inner.get_or_insert_with(|| Box::new(Value::zero_of(inner_ty)));
            }
            _ => return (ty, dest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_unwraps_pointer_chain() {
        let ty = FieldType::optional(FieldType::optional(FieldType::Int64));
        let value = Value::some(Value::some(Value::Int64(7)));
        let (ty, value) = normalize(&ty, &value).unwrap();
        assert_eq!(ty, &FieldType::Int64);
        assert_eq!(value, &Value::Int64(7));
    }

    #[test]
    fn test_normalize_rejects_nil() {
        let ty = FieldType::optional(FieldType::Int64);
        assert!(matches!(
            normalize(&ty, &Value::none()),
            Err(Error::NilValue)
        ));
        let nested = FieldType::optional(ty);
        assert!(matches!(
            normalize(&nested, &Value::some(Value::none())),
            Err(Error::NilValue)
        ));
    }

    #[test]
    fn test_dest_slot_allocates_pointees() {
        let ty = FieldType::optional(FieldType::optional(FieldType::String));
        let mut dest = Value::Bool(false);
        {
            let (ty, slot) = dest_slot(&ty, &mut dest);
            assert_eq!(ty, &FieldType::String);
            *slot = Value::String("hi".to_owned());
        }
        assert_eq!(dest, Value::some(Value::some(Value::from("hi"))));
    }
}
