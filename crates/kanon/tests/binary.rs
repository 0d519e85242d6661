//! Engine-level encode/decode behavior: canonical bytes, zero-value
//! omission, schema evolution, and the per-field designations.

use pretty_assertions::assert_eq;

use kanon::{
    Codec, Error, FieldOptions, FieldType, FixedWidth, StructSchema, Value,
};

fn sealed_codec() -> Codec {
    let mut cdc = Codec::new();
    cdc.seal();
    cdc
}

#[test]
fn test_golden_struct_slice_bytes() {
    let cdc = sealed_codec();
    let pair = StructSchema::new("Pair")
        .field("a", FieldType::Int64)
        .field("b", FieldType::Int64);
    let ty = FieldType::list(FieldType::structure(pair));

    let value = Value::List(vec![
        Value::Struct(vec![Value::Int64(100), Value::Int64(101)]),
        Value::Struct(vec![Value::Int64(102), Value::Int64(103)]),
    ]);

    let bz = cdc.marshal_binary_bare(&ty, &value).unwrap();
    assert_eq!(hex::encode(&bz), "0a04086410650a0408661067");

    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&ty, &bz, &mut decoded).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_empty_struct_encodes_to_no_bytes() {
    let cdc = sealed_codec();
    let inner = StructSchema::new("Inner").field("n", FieldType::Int64);
    let outer = StructSchema::new("Outer")
        .field("s", FieldType::String)
        .field("inner", FieldType::structure(inner.clone()));
    let ty = FieldType::structure(outer);

    let value = Value::Struct(vec![
        Value::String(String::new()),
        Value::zero_struct(&inner),
    ]);
    let bz = cdc.marshal_binary_bare(&ty, &value).unwrap();
    assert!(bz.is_empty());

    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&ty, &bz, &mut decoded).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_nil_and_empty_collections_collapse() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Holder")
        .field("bytes", FieldType::Bytes)
        .field("ints", FieldType::list(FieldType::Int64))
        .field("ptr", FieldType::optional(FieldType::String));
    let ty = FieldType::structure(schema);

    // Absent and allocated-empty are indistinguishable on the wire.
    let empties = Value::Struct(vec![
        Value::Bytes(Vec::new()),
        Value::List(Vec::new()),
        Value::none(),
    ]);
    let pointered = Value::Struct(vec![
        Value::Bytes(Vec::new()),
        Value::List(Vec::new()),
        Value::some(Value::String(String::new())),
    ]);

    let a = cdc.marshal_binary_bare(&ty, &empties).unwrap();
    let b = cdc.marshal_binary_bare(&ty, &pointered).unwrap();
    assert_eq!(a, b);
    assert!(a.is_empty());
}

#[test]
fn test_new_field_backwards_compatibility() {
    let cdc = sealed_codec();
    let v1 = StructSchema::new("Evolving/V1")
        .field("s", FieldType::String)
        .field("n", FieldType::Int64);
    let v2 = StructSchema::new("Evolving/V2")
        .field("s", FieldType::String)
        .field("n", FieldType::Int64)
        .field("extra", FieldType::String);
    let ty1 = FieldType::structure(v1);
    let ty2 = FieldType::structure(v2);

    // Newer bytes, older schema: the appended field is skipped.
    let newer = Value::Struct(vec![
        Value::from("tender"),
        Value::Int64(2014),
        Value::from("appended"),
    ]);
    let bz = cdc.marshal_binary_bare(&ty2, &newer).unwrap();
    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&ty1, &bz, &mut decoded).unwrap();
    assert_eq!(
        decoded,
        Value::Struct(vec![Value::from("tender"), Value::Int64(2014)])
    );

    // Older bytes, newer schema: the unseen field comes back zero.
    let older = Value::Struct(vec![Value::from("tender"), Value::Int64(2014)]);
    let bz = cdc.marshal_binary_bare(&ty1, &older).unwrap();
    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&ty2, &bz, &mut decoded).unwrap();
    assert_eq!(
        decoded,
        Value::Struct(vec![
            Value::from("tender"),
            Value::Int64(2014),
            Value::String(String::new()),
        ])
    );
}

#[test]
fn test_repeated_unknown_field_is_skipped() {
    let cdc = sealed_codec();
    let v1 = StructSchema::new("Tagged/V1").field("s", FieldType::String);
    let v2 = StructSchema::new("Tagged/V2")
        .field("s", FieldType::String)
        .field("tags", FieldType::list(FieldType::Int64));
    let ty1 = FieldType::structure(v1);
    let ty2 = FieldType::structure(v2);

    // The appended repeated field emits two entries with the same field
    // number; an older decoder skips both.
    let newer = Value::Struct(vec![
        Value::from("hi"),
        Value::List(vec![Value::Int64(7), Value::Int64(8)]),
    ]);
    let bz = cdc.marshal_binary_bare(&ty2, &newer).unwrap();

    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&ty1, &bz, &mut decoded).unwrap();
    assert_eq!(decoded, Value::Struct(vec![Value::from("hi")]));
}

#[test]
fn test_wire_type_mismatch_mid_struct_keeps_prior_contents() {
    let cdc = sealed_codec();
    let something = StructSchema::new("Something").field("sth", FieldType::Int64);
    let v1 = StructSchema::new("Mixed/V1")
        .field("s", FieldType::String)
        .field("n", FieldType::Int64)
        .field("some", FieldType::optional(FieldType::structure(something)));
    let v2 = StructSchema::new("Mixed/V2")
        .field("s", FieldType::String)
        .field("s2", FieldType::String);
    let ty1 = FieldType::structure(v1);
    let ty2 = FieldType::structure(v2);

    let value = Value::Struct(vec![
        Value::from("tender"),
        Value::Int64(2014),
        Value::some(Value::Struct(vec![Value::Int64(84)])),
    ]);
    let bz = cdc.marshal_binary_bare(&ty1, &value).unwrap();

    // Field 2 arrives as a varint where the second schema declares a
    // string; field 1 is updated before the failure and the untouched
    // second field keeps its prior contents.
    let mut decoded = Value::Struct(vec![Value::from("old1"), Value::from("old2")]);
    let err = cdc
        .unmarshal_binary_bare(&ty2, &bz, &mut decoded)
        .unwrap_err();
    assert!(matches!(err, Error::WireTypeMismatch { .. }));
    assert_eq!(
        decoded,
        Value::Struct(vec![Value::from("tender"), Value::from("old2")])
    );
}

#[test]
fn test_decreasing_field_order_fails_but_keeps_partial_result() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Ordered")
        .field("s", FieldType::String)
        .field("n", FieldType::Int64);
    let ty = FieldType::structure(schema);

    // Field 2, then field 1: the order violation surfaces after field 2
    // was already decoded into the destination.
    let mut bz = vec![0x10, 0xDE, 0x0F]; // n = 2014
    bz.extend_from_slice(&[0x0A, 0x06]); // s = "tender"
    bz.extend_from_slice(b"tender");

    let mut decoded = Value::Bool(false);
    let err = cdc
        .unmarshal_binary_bare(&ty, &bz, &mut decoded)
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedFieldOrder { number: 1, .. }));
    assert_eq!(
        decoded,
        Value::Struct(vec![Value::String(String::new()), Value::Int64(2014)])
    );
}

#[test]
fn test_write_empty_forces_zero_emission() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Forced")
        .field_with("n", FieldType::Int64, FieldOptions::new().write_empty())
        .field_with("s", FieldType::String, FieldOptions::new().write_empty());
    let ty = FieldType::structure(schema.clone());

    let value = Value::zero_struct(&schema);
    let bz = cdc.marshal_binary_bare(&ty, &value).unwrap();
    assert_eq!(bz, vec![0x08, 0x00, 0x12, 0x00]);

    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&ty, &bz, &mut decoded).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_write_empty_nested_struct_emits_frame() {
    let cdc = sealed_codec();
    let inner = StructSchema::new("WInner").field("n", FieldType::Int64);
    let schema = StructSchema::new("WOuter").field_with(
        "inner",
        FieldType::structure(inner.clone()),
        FieldOptions::new().write_empty(),
    );
    let ty = FieldType::structure(schema);

    let value = Value::Struct(vec![Value::zero_struct(&inner)]);
    let bz = cdc.marshal_binary_bare(&ty, &value).unwrap();
    assert_eq!(bz, vec![0x0A, 0x00]);
}

#[test]
fn test_empty_elements_rejects_nil_and_materializes_zero() {
    let cdc = sealed_codec();
    let inner = StructSchema::new("Elem").field("n", FieldType::Int64);
    let elem_ty = FieldType::optional(FieldType::structure(inner.clone()));
    let strict = StructSchema::new("Strict").field_with(
        "items",
        FieldType::list(elem_ty.clone()),
        FieldOptions::new().empty_elements(),
    );
    let lax = StructSchema::new("Lax").field("items", FieldType::list(elem_ty));
    let strict_ty = FieldType::structure(strict);
    let lax_ty = FieldType::structure(lax);

    // A nil element is rejected outright under empty_elements.
    let with_nil = Value::Struct(vec![Value::List(vec![Value::none()])]);
    let err = cdc.marshal_binary_bare(&strict_ty, &with_nil).unwrap_err();
    assert!(matches!(err, Error::NilElement { .. }));

    // The same empty payload decodes as nil without the designation and as
    // a materialized zero value with it.
    let with_zero = Value::Struct(vec![Value::List(vec![Value::some(
        Value::zero_struct(&inner),
    )])]);
    let bz = cdc.marshal_binary_bare(&strict_ty, &with_zero).unwrap();
    assert_eq!(bz, vec![0x0A, 0x00]);

    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&strict_ty, &bz, &mut decoded)
        .unwrap();
    assert_eq!(decoded, with_zero);

    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&lax_ty, &bz, &mut decoded).unwrap();
    assert_eq!(decoded, with_nil);
}

#[test]
fn test_fixed_width_designation_round_trip() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Fixed")
        .field_with(
            "n64",
            FieldType::Int64,
            FieldOptions::new().fixed(FixedWidth::Fixed64),
        )
        .field_with(
            "u32",
            FieldType::Uint32,
            FieldOptions::new().fixed(FixedWidth::Fixed32),
        );
    let ty = FieldType::structure(schema);

    let value = Value::Struct(vec![Value::Int64(-7), Value::Uint32(0xDEAD_BEEF)]);
    let bz = cdc.marshal_binary_bare(&ty, &value).unwrap();
    // key(1, fixed64) ++ 8 LE bytes, key(2, fixed32) ++ 4 LE bytes
    assert_eq!(bz.len(), 1 + 8 + 1 + 4);
    assert_eq!(bz[0], 0x09);
    assert_eq!(bz[9], 0x15);

    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&ty, &bz, &mut decoded).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_narrow_ints_zigzag_and_range_check() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Narrow").field("b", FieldType::Int8);
    let ty = FieldType::structure(schema);

    let bz = cdc
        .marshal_binary_bare(&ty, &Value::Struct(vec![Value::Int8(-1)]))
        .unwrap();
    assert_eq!(bz, vec![0x08, 0x01]); // zigzag(-1) == 1

    // zigzag 300 decodes to 150, out of range for an int8.
    let mut decoded = Value::Bool(false);
    let err = cdc
        .unmarshal_binary_bare(&ty, &[0x08, 0xAC, 0x02], &mut decoded)
        .unwrap_err();
    assert!(matches!(err, Error::RangeOverflow { value: 150, .. }));
}

#[test]
fn test_bool_rejects_non_canonical_varint() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Flag").field("on", FieldType::Bool);
    let ty = FieldType::structure(schema);

    let mut decoded = Value::Bool(false);
    let err = cdc
        .unmarshal_binary_bare(&ty, &[0x08, 0x02], &mut decoded)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidBool { value: 2 }));
}

#[test]
fn test_negative_zero_float_survives_round_trip() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Floaty").field("f", FieldType::Float64);
    let ty = FieldType::structure(schema);

    let value = Value::Struct(vec![Value::Float64(-0.0)]);
    let bz = cdc.marshal_binary_bare(&ty, &value).unwrap();
    assert!(!bz.is_empty());

    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&ty, &bz, &mut decoded).unwrap();
    let Value::Struct(fields) = decoded else {
        panic!("expected struct")
    };
    let Value::Float64(f) = &fields[0] else {
        panic!("expected float64")
    };
    assert_eq!(f.to_bits(), (-0.0f64).to_bits());
}

#[test]
fn test_nested_list_framing() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Matrix").field(
        "rows",
        FieldType::list(FieldType::list(FieldType::Int64)),
    );
    let ty = FieldType::structure(schema);

    let value = Value::Struct(vec![Value::List(vec![
        Value::List(vec![Value::Int64(1), Value::Int64(2)]),
        Value::List(vec![Value::Int64(3)]),
    ])]);
    let bz = cdc.marshal_binary_bare(&ty, &value).unwrap();
    // Each row is a frame of entries keyed as field 1.
    assert_eq!(bz, vec![0x0A, 0x04, 0x08, 0x01, 0x08, 0x02, 0x0A, 0x02, 0x08, 0x03]);

    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&ty, &bz, &mut decoded).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_list_of_strings_round_trip() {
    let cdc = sealed_codec();
    let ty = FieldType::list(FieldType::String);
    let value = Value::List(vec![Value::from("alpha"), Value::from(""), Value::from("beta")]);

    let bz = cdc.marshal_binary_bare(&ty, &value).unwrap();
    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&ty, &bz, &mut decoded).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_truncated_frame_is_an_error() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Framed").field("s", FieldType::String);
    let ty = FieldType::structure(schema);

    // Length prefix of 5 with only one byte behind it.
    let mut decoded = Value::Bool(false);
    let err = cdc
        .unmarshal_binary_bare(&ty, &[0x0A, 0x05, 0x61], &mut decoded)
        .unwrap_err();
    assert!(err.is_data_error());
}

#[test]
fn test_wire_type_mismatch_is_an_error() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Mismatched").field("n", FieldType::Int64);
    let ty = FieldType::structure(schema);

    // Field 1 arrives length-delimited where a varint is declared.
    let mut decoded = Value::Bool(false);
    let err = cdc
        .unmarshal_binary_bare(&ty, &[0x0A, 0x01, 0x00], &mut decoded)
        .unwrap_err();
    assert!(matches!(err, Error::WireTypeMismatch { .. }));
}

#[test]
fn test_scalar_top_level_values() {
    let cdc = sealed_codec();

    let bz = cdc
        .marshal_binary_bare(&FieldType::Uint64, &Value::Uint64(120))
        .unwrap();
    assert_eq!(bz, vec![0x08, 0x78]);

    let bz = cdc
        .marshal_binary_bare(&FieldType::String, &Value::from("x"))
        .unwrap();
    assert_eq!(bz, vec![0x0A, 0x01, b'x']);

    let mut decoded = Value::Bool(false);
    cdc.unmarshal_binary_bare(&FieldType::Uint64, &[0x08, 0x78], &mut decoded)
        .unwrap();
    assert_eq!(decoded, Value::Uint64(120));
}

#[test]
fn test_func_and_chan_are_recoverable_errors() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Handles").field("f", FieldType::Func);
    let ty = FieldType::structure(schema);

    let err = cdc
        .marshal_binary_bare(&ty, &Value::Struct(vec![Value::Func]))
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedKind { kind: "func" }));
}

#[test]
#[should_panic(expected = "map-kinded")]
fn test_map_field_panics() {
    let cdc = sealed_codec();
    let schema = StructSchema::new("Mapped").field(
        "m",
        FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::Int64)),
    );
    let ty = FieldType::structure(schema);
    let _ = cdc.marshal_binary_bare(&ty, &Value::Struct(vec![Value::Map(Vec::new())]));
}
