//! Reflective decoder.
//!
//! Decoding is strictly positional: field keys are read one at a time and
//! field numbers within a struct must be non-decreasing against the known
//! field list. A known field that never appears is restored to its zero
//! value; unknown trailing field numbers are skipped by wire type
//! (forward-compatible schema evolution); a field number that moves backwards
//! is a structural error, never a silent misassignment.

use tracing::trace;

use crate::error::{Error, Result};
use crate::registry::{TypeDescriptor, DISAMB_ESCAPE};
use crate::schema::{FieldPlan, FieldType, FixedWidth, StructPlan, Value};
use crate::wire::primitive::{
    decode_bool, decode_byte_slice, decode_fixed32, decode_fixed64, decode_float32,
    decode_float64, decode_string, decode_uvarint, decode_varint,
};
use crate::wire::{decode_field_key, skip_payload, WireType};

use super::encode::{element_wire, implicit_field};
use super::Codec;

/// Decode a value in top-level form into `dest`, returning bytes consumed.
///
/// Mirrors the encoder: structs decode from bare field entries, anything
/// else through the implicit single-field wrapper.
pub(crate) fn decode_toplevel(
    cdc: &Codec,
    ty: &FieldType,
    bz: &[u8],
    dest: &mut Value,
) -> Result<usize> {
    match ty {
        FieldType::Struct(schema) => {
            let plan = cdc.plan_for(schema)?;
            let fields = struct_slots(dest, &plan);
            decode_struct(cdc, &plan, bz, fields)
        }
        _ => {
            let fp = implicit_field(ty)?;
            let plan = StructPlan {
                name: "(wrapped)".to_owned(),
                fields: vec![fp],
            };
            let mut slots = vec![std::mem::replace(dest, Value::Bool(false))];
            let res = decode_struct(cdc, &plan, bz, &mut slots);
            *dest = slots.pop().expect("wrapper slot");
            res
        }
    }
}

/// Reuse the destination's field slots when its shape already matches the
/// plan, otherwise reset it to the schema's zero value. Reusing slots is
/// what lets fields decoded before an error retain their values.
fn struct_slots<'a>(dest: &'a mut Value, plan: &StructPlan) -> &'a mut Vec<Value> {
    let fits = matches!(dest, Value::Struct(fields) if fields.len() == plan.fields.len());
    if !fits {
        *dest = Value::Struct(
            plan.fields
                .iter()
                .map(|f| Value::zero_of(&f.ty))
                .collect(),
        );
    }
    match dest {
        Value::Struct(fields) => fields,
        _ => unreachable!(),
    }
}

fn decode_struct(
    cdc: &Codec,
    plan: &StructPlan,
    bz: &[u8],
    fields: &mut [Value],
) -> Result<usize> {
    let mut n = 0;
    let mut last = 0u32;

    for fp in &plan.fields {
        if n >= bz.len() {
            // Input exhausted: unseen fields are restored to zero.
            fields[fp.order] = Value::zero_of(&fp.ty);
            continue;
        }
        let (number, wire, kn) = decode_field_key(&bz[n..])?;
        if number < fp.number {
            return Err(Error::UnexpectedFieldOrder { number, last });
        }
        if number > fp.number {
            // This field was omitted at encode time (zero value, or an
            // older encoder that never knew it).
            fields[fp.order] = Value::zero_of(&fp.ty);
            continue;
        }
        if wire != fp.wire {
            return Err(Error::WireTypeMismatch {
                field: fp.name.clone(),
                expected: fp.wire,
                got: wire,
            });
        }
        n += kn;

        if let FieldType::List(elem) = &fp.ty {
            let mut items = Vec::new();
            let (item, m) = decode_element(cdc, elem, fp.empty_elements, fp.fixed, &bz[n..])?;
            n += m;
            items.push(item);
            // Consume consecutive entries carrying the same field number.
            while n < bz.len() {
                let Ok((number2, wire2, kn2)) = decode_field_key(&bz[n..]) else {
                    break;
                };
                if number2 != fp.number {
                    break;
                }
                if wire2 != fp.wire {
                    return Err(Error::WireTypeMismatch {
                        field: fp.name.clone(),
                        expected: fp.wire,
                        got: wire2,
                    });
                }
                n += kn2;
                let (item, m) =
                    decode_element(cdc, elem, fp.empty_elements, fp.fixed, &bz[n..])?;
                n += m;
                items.push(item);
            }
            fields[fp.order] = Value::List(items);
        } else {
            let m = decode_payload(cdc, fp, &fp.ty, &bz[n..], &mut fields[fp.order])?;
            n += m;
        }
        last = fp.number;
    }

    // Known fields exhausted: remaining higher field numbers are
    // forward-compatible unknowns, skipped by wire type. Numbers may
    // repeat (a newer schema's repeated field) but never decrease.
    while n < bz.len() {
        let (number, wire, kn) = decode_field_key(&bz[n..])?;
        if number < last {
            return Err(Error::UnexpectedFieldOrder { number, last });
        }
        n += kn;
        n += skip_payload(wire, &bz[n..])?;
        trace!(number, ?wire, "skipped unknown field");
        last = number;
    }

    Ok(n)
}

/// Decode one non-list field payload into `dest`.
fn decode_payload(
    cdc: &Codec,
    fp: &FieldPlan,
    ty: &FieldType,
    bz: &[u8],
    dest: &mut Value,
) -> Result<usize> {
    match ty {
        FieldType::Optional(pointee) => {
            // Pointers are transparent: a present payload decodes as the
            // pointee; absence never reaches here (zero fill yields nil).
            let mut inner = Value::zero_of(pointee);
            let n = decode_payload(cdc, fp, pointee, bz, &mut inner)?;
            *dest = Value::some(inner);
            Ok(n)
        }

        FieldType::Struct(schema) => {
            let (content, n) = decode_byte_slice(bz)?;
            let plan = cdc.plan_for(schema)?;
            let slots = struct_slots(dest, &plan);
            decode_struct(cdc, &plan, &content, slots)?;
            Ok(n)
        }

        FieldType::Any(_) => {
            let (content, n) = decode_byte_slice(bz)?;
            *dest = decode_any(cdc, &content)?;
            Ok(n)
        }

        FieldType::String => {
            let (s, n) = decode_string(bz)?;
            *dest = Value::String(s);
            Ok(n)
        }

        FieldType::Bytes => {
            let (raw, n) = decode_byte_slice(bz)?;
            *dest = Value::Bytes(raw);
            Ok(n)
        }

        FieldType::Map(_, _) => {
            panic!("map-kinded values can never be decoded: iteration order is not canonical")
        }
        FieldType::Func => Err(Error::unsupported_kind("func")),
        FieldType::Chan => Err(Error::unsupported_kind("chan")),

        FieldType::List(_) => unreachable!("list fields are consumed by the struct loop"),

        _ => {
            let (v, n) = decode_scalar(ty, fp.wire, bz)?;
            *dest = v;
            Ok(n)
        }
    }
}

/// Decode one collection element payload.
fn decode_element(
    cdc: &Codec,
    elem: &FieldType,
    empty_elements: bool,
    fixed: Option<FixedWidth>,
    bz: &[u8],
) -> Result<(Value, usize)> {
    match elem {
        FieldType::Optional(pointee) => {
            if element_wire(pointee, fixed)? == WireType::ByteLength {
                // Peek the frame: an empty payload is a nil element, unless
                // empty_elements asks for a materialized zero value.
                let (content, n) = decode_byte_slice(bz)?;
                if content.is_empty() {
                    let v = if empty_elements {
                        Value::some(Value::zero_of(pointee))
                    } else {
                        Value::none()
                    };
                    return Ok((v, n));
                }
            }
            let (v, n) = decode_element(cdc, pointee, false, fixed, bz)?;
            Ok((Value::some(v), n))
        }

        FieldType::String => {
            let (s, n) = decode_string(bz)?;
            Ok((Value::String(s), n))
        }

        FieldType::Bytes => {
            let (raw, n) = decode_byte_slice(bz)?;
            Ok((Value::Bytes(raw), n))
        }

        FieldType::Struct(schema) => {
            let (content, n) = decode_byte_slice(bz)?;
            let plan = cdc.plan_for(schema)?;
            let mut v = Value::zero_struct(schema);
            let slots = struct_slots(&mut v, &plan);
            decode_struct(cdc, &plan, &content, slots)?;
            Ok((v, n))
        }

        FieldType::Any(_) => {
            let (content, n) = decode_byte_slice(bz)?;
            Ok((decode_any(cdc, &content)?, n))
        }

        FieldType::List(inner) => {
            // Nested list: a frame of entries keyed as implicit field 1.
            let (content, n) = decode_byte_slice(bz)?;
            let wire = element_wire(inner, fixed)?;
            let mut items = Vec::new();
            let mut k = 0;
            while k < content.len() {
                let (number, got, kn) = decode_field_key(&content[k..])?;
                if number != 1 {
                    return Err(Error::UnexpectedFieldOrder { number, last: 1 });
                }
                if got != wire {
                    return Err(Error::WireTypeMismatch {
                        field: "(element)".to_owned(),
                        expected: wire,
                        got,
                    });
                }
                k += kn;
                let (item, m) = decode_element(cdc, inner, false, fixed, &content[k..])?;
                k += m;
                items.push(item);
            }
            Ok((Value::List(items), n))
        }

        FieldType::Map(_, _) => {
            panic!("map-kinded values can never be decoded: iteration order is not canonical")
        }
        FieldType::Func => Err(Error::unsupported_kind("func")),
        FieldType::Chan => Err(Error::unsupported_kind("chan")),

        _ => decode_scalar(elem, element_wire(elem, fixed)?, bz),
    }
}

/// Resolve a polymorphic envelope's content: nil marker, long disfix form,
/// or bare prefix form, followed by the concrete value in top-level form.
fn decode_any(cdc: &Codec, content: &[u8]) -> Result<Value> {
    if content.is_empty() {
        return Ok(Value::Any(None));
    }
    if content[0] == DISAMB_ESCAPE {
        if content.len() >= 2 && content[1] == 0x00 {
            if content.len() != 2 {
                return Err(Error::TrailingBytes {
                    consumed: 2,
                    total: content.len(),
                });
            }
            return Ok(Value::Any(None));
        }
        if content.len() < 8 {
            return Err(Error::truncated(content.len()));
        }
        let disamb = [content[1], content[2], content[3]];
        let prefix = [content[4], content[5], content[6], content[7]];
        let desc = cdc
            .registry()
            .descriptor_by_disfix(&disamb, &prefix)
            .ok_or(Error::UnknownDisfix { disamb, prefix })?;
        decode_concrete(cdc, desc, &content[8..])
    } else {
        if content.len() < 4 {
            return Err(Error::truncated(content.len()));
        }
        let prefix = [content[0], content[1], content[2], content[3]];
        let desc = cdc
            .registry()
            .descriptor_by_prefix(&prefix)
            .ok_or(Error::UnknownPrefix { prefix })?;
        decode_concrete(cdc, desc, &content[4..])
    }
}

fn decode_concrete(cdc: &Codec, desc: &TypeDescriptor, bz: &[u8]) -> Result<Value> {
    let mut v = Value::zero_of(&desc.ty);
    let n = decode_toplevel(cdc, &desc.ty, bz, &mut v)?;
    if n != bz.len() {
        return Err(Error::TrailingBytes {
            consumed: n,
            total: bz.len(),
        });
    }
    Ok(Value::any(desc.name.clone(), v))
}

/// Decode a leaf payload according to its kind and resolved wire type,
/// range-checking narrow widths instead of silently truncating.
fn decode_scalar(ty: &FieldType, wire: WireType, bz: &[u8]) -> Result<(Value, usize)> {
    match ty {
        FieldType::Bool => match wire {
            WireType::Varint => {
                let (b, n) = decode_bool(bz)?;
                Ok((Value::Bool(b), n))
            }
            _ => {
                let (u, n) = take_unsigned(wire, bz)?;
                match u {
                    0 => Ok((Value::Bool(false), n)),
                    1 => Ok((Value::Bool(true), n)),
                    value => Err(Error::InvalidBool { value }),
                }
            }
        },
        FieldType::Int8 => {
            let (x, n) = take_zigzag(wire, bz)?;
            let x = i8::try_from(x).map_err(|_| Error::range_overflow(x, "int8"))?;
            Ok((Value::Int8(x), n))
        }
        FieldType::Int16 => {
            let (x, n) = take_zigzag(wire, bz)?;
            let x = i16::try_from(x).map_err(|_| Error::range_overflow(x, "int16"))?;
            Ok((Value::Int16(x), n))
        }
        FieldType::Int32 => {
            let (x, n) = take_signed(wire, bz)?;
            let x = i32::try_from(x).map_err(|_| Error::range_overflow(x, "int32"))?;
            Ok((Value::Int32(x), n))
        }
        FieldType::Int64 => {
            let (x, n) = take_signed(wire, bz)?;
            Ok((Value::Int64(x), n))
        }
        FieldType::Uint8 => {
            let (u, n) = take_unsigned(wire, bz)?;
            let u = u8::try_from(u).map_err(|_| Error::range_overflow(u, "uint8"))?;
            Ok((Value::Uint8(u), n))
        }
        FieldType::Uint16 => {
            let (u, n) = take_unsigned(wire, bz)?;
            let u = u16::try_from(u).map_err(|_| Error::range_overflow(u, "uint16"))?;
            Ok((Value::Uint16(u), n))
        }
        FieldType::Uint32 => {
            let (u, n) = take_unsigned(wire, bz)?;
            let u = u32::try_from(u).map_err(|_| Error::range_overflow(u, "uint32"))?;
            Ok((Value::Uint32(u), n))
        }
        FieldType::Uint64 => {
            let (u, n) = take_unsigned(wire, bz)?;
            Ok((Value::Uint64(u), n))
        }
        FieldType::Float32 => {
            let (f, n) = decode_float32(bz)?;
            Ok((Value::Float32(f), n))
        }
        FieldType::Float64 => {
            let (f, n) = decode_float64(bz)?;
            Ok((Value::Float64(f), n))
        }
        _ => unreachable!("decode_scalar only handles leaf kinds"),
    }
}

/// Signed integers that zigzag under the varint wire type (8/16-bit kinds).
fn take_zigzag(wire: WireType, bz: &[u8]) -> Result<(i64, usize)> {
    match wire {
        WireType::Varint => decode_varint(bz),
        _ => take_signed(wire, bz),
    }
}

/// Signed integers stored as the plain two's-complement cast.
fn take_signed(wire: WireType, bz: &[u8]) -> Result<(i64, usize)> {
    match wire {
        WireType::Varint => {
            let (u, n) = decode_uvarint(bz)?;
            Ok((u as i64, n))
        }
        WireType::Fixed32 => {
            let (u, n) = decode_fixed32(bz)?;
            Ok((i64::from(u as i32), n))
        }
        WireType::Fixed64 => {
            let (u, n) = decode_fixed64(bz)?;
            Ok((u as i64, n))
        }
        WireType::ByteLength => unreachable!("integers are never length-delimited"),
    }
}

fn take_unsigned(wire: WireType, bz: &[u8]) -> Result<(u64, usize)> {
    match wire {
        WireType::Varint => decode_uvarint(bz),
        WireType::Fixed32 => {
            let (u, n) = decode_fixed32(bz)?;
            Ok((u64::from(u), n))
        }
        WireType::Fixed64 => decode_fixed64(bz),
        WireType::ByteLength => unreachable!("integers are never length-delimited"),
    }
}
