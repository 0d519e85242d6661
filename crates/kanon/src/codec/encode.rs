//! Reflective encoder.
//!
//! Walks a value against its structural description and appends canonical
//! bytes. Struct fields are processed strictly in declaration order; fields
//! at their zero value are omitted entirely unless `write_empty` is set, so
//! an absent collection and an allocated empty one produce byte-identical
//! output. Nested structs and polymorphic values are encoded bare into a
//! scratch region and emitted length-prefixed.

use crate::error::{Error, Result};
use crate::registry::NIL_MARKER;
use crate::schema::{AnyValue, FieldPlan, FieldType, FixedWidth, StructPlan, Value};
use crate::schema::wire_for;
use crate::wire::primitive::{
    encode_bool, encode_byte_slice, encode_fixed32, encode_fixed64, encode_float32,
    encode_float64, encode_string, encode_uvarint, encode_varint,
};
use crate::wire::{encode_field_key, WireType};

use super::Codec;

/// Wire type an element of the given kind occupies inside a collection. The
/// field's fixed-width designation applies at every nesting level.
pub(crate) fn element_wire(ty: &FieldType, fixed: Option<FixedWidth>) -> Result<WireType> {
    match ty {
        FieldType::List(_) => Ok(WireType::ByteLength),
        _ => wire_for(ty, fixed),
    }
}

/// Synthesize the implicit single-field plan used to wrap non-struct
/// top-level values and non-struct concrete payloads.
pub(crate) fn implicit_field(ty: &FieldType) -> Result<FieldPlan> {
    Ok(FieldPlan {
        order: 0,
        name: "(wrapped)".to_owned(),
        number: 1,
        wire: wire_for(ty, None)?,
        write_empty: false,
        empty_elements: false,
        fixed: None,
        ty: ty.clone(),
    })
}

/// Encode a value in top-level form: structs encode as their bare field
/// entries, anything else is wrapped in an implicit single-field struct.
pub(crate) fn encode_toplevel(
    cdc: &Codec,
    ty: &FieldType,
    value: &Value,
    buf: &mut Vec<u8>,
) -> Result<()> {
    match ty {
        FieldType::Struct(schema) => {
            let plan = cdc.plan_for(schema)?;
            let fields = expect_struct(&plan, value)?;
            encode_struct(cdc, &plan, fields, buf)
        }
        _ => {
            let fp = implicit_field(ty)?;
            encode_field(cdc, &fp, value, buf)
        }
    }
}

fn expect_struct<'a>(plan: &StructPlan, value: &'a Value) -> Result<&'a [Value]> {
    let Value::Struct(fields) = value else {
        return Err(Error::kind_mismatch("struct", value.kind_name()));
    };
    if fields.len() != plan.fields.len() {
        return Err(Error::ArityMismatch {
            schema: plan.name.clone(),
            expected: plan.fields.len(),
            got: fields.len(),
        });
    }
    Ok(fields)
}

pub(crate) fn encode_struct(
    cdc: &Codec,
    plan: &StructPlan,
    fields: &[Value],
    buf: &mut Vec<u8>,
) -> Result<()> {
    for (fp, value) in plan.fields.iter().zip(fields) {
        encode_field(cdc, fp, value, buf)?;
    }
    Ok(())
}

fn encode_field(cdc: &Codec, fp: &FieldPlan, value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    encode_field_as(cdc, fp, &fp.ty, value, buf)
}

/// Encode one field entry, with pointer transparency: an `Optional` layer
/// recurses into its pointee, a nil pointer behaves as the pointee's zero
/// value.
fn encode_field_as(
    cdc: &Codec,
    fp: &FieldPlan,
    ty: &FieldType,
    value: &Value,
    buf: &mut Vec<u8>,
) -> Result<()> {
    match ty {
        FieldType::Optional(inner) => match value {
            Value::Optional(Some(v)) => encode_field_as(cdc, fp, inner, v, buf),
            Value::Optional(None) => {
                if fp.write_empty {
                    let zero = Value::zero_of(inner);
                    encode_field_as(cdc, fp, inner, &zero, buf)
                } else {
                    Ok(())
                }
            }
            other => Err(Error::kind_mismatch("optional", other.kind_name())),
        },

        FieldType::List(elem) => {
            let Value::List(items) = value else {
                return Err(Error::kind_mismatch("list", value.kind_name()));
            };
            // An empty repeated field is inexpressible on the wire; it is
            // always omitted, write_empty or not.
            for item in items {
                encode_field_key(buf, fp.number, fp.wire);
                encode_element(cdc, fp, elem, item, buf)?;
            }
            Ok(())
        }

        FieldType::Struct(schema) => {
            let plan = cdc.plan_for(schema)?;
            let fields = expect_struct(&plan, value)?;
            let mut scratch = Vec::new();
            encode_struct(cdc, &plan, fields, &mut scratch)?;
            // An all-zero nested struct encodes to an empty region; if the
            // field also qualifies for omission the two compose and the
            // field disappears entirely.
            if scratch.is_empty() && !fp.write_empty {
                return Ok(());
            }
            encode_field_key(buf, fp.number, fp.wire);
            encode_byte_slice(buf, &scratch);
            Ok(())
        }

        FieldType::Any(category) => {
            let Value::Any(inner) = value else {
                return Err(Error::kind_mismatch("any", value.kind_name()));
            };
            match inner {
                None => {
                    if fp.write_empty {
                        encode_field_key(buf, fp.number, fp.wire);
                        encode_byte_slice(buf, &NIL_MARKER);
                    }
                    Ok(())
                }
                Some(av) => {
                    if !cdc.registry().has_interface(category) {
                        return Err(Error::UnregisteredInterface {
                            category: category.clone(),
                        });
                    }
                    let mut scratch = Vec::new();
                    encode_any_payload(cdc, av, &mut scratch)?;
                    encode_field_key(buf, fp.number, fp.wire);
                    encode_byte_slice(buf, &scratch);
                    Ok(())
                }
            }
        }

        FieldType::String => {
            let Value::String(s) = value else {
                return Err(Error::kind_mismatch("string", value.kind_name()));
            };
            if s.is_empty() && !fp.write_empty {
                return Ok(());
            }
            encode_field_key(buf, fp.number, fp.wire);
            encode_string(buf, s);
            Ok(())
        }

        FieldType::Bytes => {
            let Value::Bytes(bz) = value else {
                return Err(Error::kind_mismatch("bytes", value.kind_name()));
            };
            if bz.is_empty() && !fp.write_empty {
                return Ok(());
            }
            encode_field_key(buf, fp.number, fp.wire);
            encode_byte_slice(buf, bz);
            Ok(())
        }

        FieldType::Map(_, _) => {
            panic!("map-kinded values can never be encoded: iteration order is not canonical")
        }
        FieldType::Func => Err(Error::unsupported_kind("func")),
        FieldType::Chan => Err(Error::unsupported_kind("chan")),

        _ => {
            if value.is_zero() && !fp.write_empty {
                return Ok(());
            }
            encode_field_key(buf, fp.number, fp.wire);
            encode_scalar(ty, fp.wire, value, buf)
        }
    }
}

/// Encode one collection element payload (the bytes after the repeated
/// field key).
fn encode_element(
    cdc: &Codec,
    fp: &FieldPlan,
    elem: &FieldType,
    item: &Value,
    buf: &mut Vec<u8>,
) -> Result<()> {
    match elem {
        FieldType::Optional(pointee) => match item {
            Value::Optional(Some(v)) => encode_element(cdc, fp, pointee, v, buf),
            Value::Optional(None) => {
                if fp.empty_elements {
                    return Err(Error::NilElement {
                        field: fp.name.clone(),
                    });
                }
                if element_wire(pointee, fp.fixed)? != WireType::ByteLength {
                    return Err(Error::unsupported_kind("nil-pointer-to-scalar"));
                }
                // A nil element is an empty payload, reconstructed as nil
                // on decode.
                encode_byte_slice(buf, &[]);
                Ok(())
            }
            other => Err(Error::kind_mismatch("optional", other.kind_name())),
        },

        FieldType::String => {
            let Value::String(s) = item else {
                return Err(Error::kind_mismatch("string", item.kind_name()));
            };
            encode_string(buf, s);
            Ok(())
        }

        FieldType::Bytes => {
            let Value::Bytes(bz) = item else {
                return Err(Error::kind_mismatch("bytes", item.kind_name()));
            };
            encode_byte_slice(buf, bz);
            Ok(())
        }

        FieldType::Struct(schema) => {
            let plan = cdc.plan_for(schema)?;
            let fields = expect_struct(&plan, item)?;
            let mut scratch = Vec::new();
            encode_struct(cdc, &plan, fields, &mut scratch)?;
            encode_byte_slice(buf, &scratch);
            Ok(())
        }

        FieldType::Any(category) => {
            let Value::Any(inner) = item else {
                return Err(Error::kind_mismatch("any", item.kind_name()));
            };
            match inner {
                None => {
                    encode_byte_slice(buf, &NIL_MARKER);
                    Ok(())
                }
                Some(av) => {
                    if !cdc.registry().has_interface(category) {
                        return Err(Error::UnregisteredInterface {
                            category: category.clone(),
                        });
                    }
                    let mut scratch = Vec::new();
                    encode_any_payload(cdc, av, &mut scratch)?;
                    encode_byte_slice(buf, &scratch);
                    Ok(())
                }
            }
        }

        FieldType::List(inner) => {
            let Value::List(items) = item else {
                return Err(Error::kind_mismatch("list", item.kind_name()));
            };
            // A nested list frames its own elements keyed as implicit
            // field 1.
            let wire = element_wire(inner, fp.fixed)?;
            let mut scratch = Vec::new();
            for sub in items {
                encode_field_key(&mut scratch, 1, wire);
                encode_element(cdc, fp, inner, sub, &mut scratch)?;
            }
            encode_byte_slice(buf, &scratch);
            Ok(())
        }

        FieldType::Map(_, _) => {
            panic!("map-kinded values can never be encoded: iteration order is not canonical")
        }
        FieldType::Func => Err(Error::unsupported_kind("func")),
        FieldType::Chan => Err(Error::unsupported_kind("chan")),

        _ => encode_scalar(elem, element_wire(elem, fp.fixed)?, item, buf),
    }
}

/// Encode the inside of a polymorphic envelope: the concrete type's
/// registry-derived prefix bytes, then the concrete value in top-level form.
fn encode_any_payload(cdc: &Codec, av: &AnyValue, buf: &mut Vec<u8>) -> Result<()> {
    let desc = cdc
        .registry()
        .descriptor_by_name(&av.name)
        .ok_or_else(|| Error::UnregisteredConcrete {
            name: av.name.clone(),
        })?;
    buf.extend_from_slice(&desc.prefix);
    encode_toplevel(cdc, &desc.ty, &av.value, buf)
}

/// Encode a leaf payload according to its kind and resolved wire type.
fn encode_scalar(ty: &FieldType, wire: WireType, value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    match (ty, value) {
        (FieldType::Bool, Value::Bool(b)) => match wire {
            WireType::Varint => {
                encode_bool(buf, *b);
                Ok(())
            }
            _ => put_unsigned(buf, wire, u64::from(*b)),
        },
        (FieldType::Int8, Value::Int8(x)) => put_zigzag(buf, wire, i64::from(*x)),
        (FieldType::Int16, Value::Int16(x)) => put_zigzag(buf, wire, i64::from(*x)),
        (FieldType::Int32, Value::Int32(x)) => put_signed(buf, wire, i64::from(*x)),
        (FieldType::Int64, Value::Int64(x)) => put_signed(buf, wire, *x),
        (FieldType::Uint8, Value::Uint8(x)) => put_unsigned(buf, wire, u64::from(*x)),
        (FieldType::Uint16, Value::Uint16(x)) => put_unsigned(buf, wire, u64::from(*x)),
        (FieldType::Uint32, Value::Uint32(x)) => put_unsigned(buf, wire, u64::from(*x)),
        (FieldType::Uint64, Value::Uint64(x)) => put_unsigned(buf, wire, *x),
        (FieldType::Float32, Value::Float32(f)) => {
            encode_float32(buf, *f);
            Ok(())
        }
        (FieldType::Float64, Value::Float64(f)) => {
            encode_float64(buf, *f);
            Ok(())
        }
        _ => Err(Error::kind_mismatch(ty.kind_name(), value.kind_name())),
    }
}

/// Signed integers that zigzag under the varint wire type (8/16-bit kinds).
fn put_zigzag(buf: &mut Vec<u8>, wire: WireType, x: i64) -> Result<()> {
    match wire {
        WireType::Varint => {
            encode_varint(buf, x);
            Ok(())
        }
        _ => put_signed(buf, wire, x),
    }
}

/// Signed integers that encode as the plain two's-complement cast.
fn put_signed(buf: &mut Vec<u8>, wire: WireType, x: i64) -> Result<()> {
    match wire {
        WireType::Varint => encode_uvarint(buf, x as u64),
        WireType::Fixed32 => {
            let v = i32::try_from(x).map_err(|_| Error::range_overflow(x, "fixed32"))?;
            encode_fixed32(buf, v as u32);
        }
        WireType::Fixed64 => encode_fixed64(buf, x as u64),
        WireType::ByteLength => unreachable!("integers are never length-delimited"),
    }
    Ok(())
}

fn put_unsigned(buf: &mut Vec<u8>, wire: WireType, x: u64) -> Result<()> {
    match wire {
        WireType::Varint => encode_uvarint(buf, x),
        WireType::Fixed32 => {
            let v = u32::try_from(x).map_err(|_| Error::range_overflow(x, "fixed32"))?;
            encode_fixed32(buf, v);
        }
        WireType::Fixed64 => encode_fixed64(buf, x),
        WireType::ByteLength => unreachable!("integers are never length-delimited"),
    }
    Ok(())
}
