//! Memoized per-struct field plans.
//!
//! A plan is a pure function of its schema, computed on first sight of a type
//! and cached for the codec's lifetime. The cache supports concurrent
//! read-through insertion; redundant computation and last-writer-wins
//! insertion are both fine because every writer computes the same plan.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use super::{FieldType, FixedWidth, StructSchema};
use crate::error::{Error, Result};
use crate::wire::WireType;

/// Resolved encoding facts for one declared field
#[derive(Debug, Clone)]
pub struct FieldPlan {
    /// Zero-based declaration order
    pub order: usize,
    /// Declared field name (diagnostics only)
    pub name: String,
    /// Wire field number: declaration order + 1
    pub number: u32,
    /// Wire type chosen from the kind and designations
    pub wire: WireType,
    /// `write_empty` designation
    pub write_empty: bool,
    /// `empty_elements` designation
    pub empty_elements: bool,
    /// Fixed-width storage designation, applied at every nesting level
    pub fixed: Option<FixedWidth>,
    /// Structural kind of the field
    pub ty: FieldType,
}

/// All field plans of one struct type, in declaration order
#[derive(Debug, Clone)]
pub struct StructPlan {
    /// Name of the planned schema
    pub name: String,
    /// Field plans in declaration order
    pub fields: Vec<FieldPlan>,
}

/// Choose the wire type for a kind plus its fixed-width designation.
///
/// Lists take their element's wire type (one keyed entry per element) and
/// pointers are transparent.
///
/// # Panics
///
/// Panics on a map kind: map iteration order is not canonical and the
/// format's determinism guarantee depends entirely on deterministic ordering.
pub(crate) fn wire_for(ty: &FieldType, fixed: Option<FixedWidth>) -> Result<WireType> {
    match ty {
        FieldType::Bool
        | FieldType::Int8
        | FieldType::Int16
        | FieldType::Int32
        | FieldType::Int64
        | FieldType::Uint8
        | FieldType::Uint16
        | FieldType::Uint32
        | FieldType::Uint64 => Ok(match fixed {
            Some(FixedWidth::Fixed32) => WireType::Fixed32,
            Some(FixedWidth::Fixed64) => WireType::Fixed64,
            None => WireType::Varint,
        }),
        FieldType::Float32 => Ok(WireType::Fixed32),
        FieldType::Float64 => Ok(WireType::Fixed64),
        FieldType::String
        | FieldType::Bytes
        | FieldType::Struct(_)
        | FieldType::Any(_) => Ok(WireType::ByteLength),
        // A list field takes its element's wire type; an element that is
        // itself a list is always ByteLength-framed.
        FieldType::List(elem) => match elem.as_ref() {
            FieldType::List(_) => Ok(WireType::ByteLength),
            _ => wire_for(elem, fixed),
        },
        FieldType::Optional(inner) => wire_for(inner, fixed),
        FieldType::Map(_, _) => {
            panic!("map-kinded values can never be encoded or decoded: iteration order is not canonical")
        }
        FieldType::Func => Err(Error::unsupported_kind("func")),
        FieldType::Chan => Err(Error::unsupported_kind("chan")),
    }
}

/// Lazy concurrent cache of struct plans, keyed by schema name
#[derive(Debug, Default)]
pub(crate) struct PlanCache {
    plans: DashMap<String, Arc<StructPlan>>,
}

impl PlanCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached plan for a schema, computing it on first sight.
    pub(crate) fn plan_for(&self, schema: &StructSchema) -> Result<Arc<StructPlan>> {
        if let Some(plan) = self.plans.get(&schema.name) {
            return Ok(Arc::clone(&plan));
        }

        let mut fields = Vec::with_capacity(schema.fields.len());
        for (order, field) in schema.fields.iter().enumerate() {
            fields.push(FieldPlan {
                order,
                name: field.name.clone(),
                number: (order + 1) as u32,
                wire: wire_for(&field.ty, field.options.fixed)?,
                write_empty: field.options.write_empty,
                empty_elements: field.options.empty_elements,
                fixed: field.options.fixed,
                ty: field.ty.clone(),
            });
        }
        let plan = Arc::new(StructPlan {
            name: schema.name.clone(),
            fields,
        });
        trace!(schema = %schema.name, fields = plan.fields.len(), "computed struct plan");

        // Concurrent first sights may race here; every writer computed the
        // same plan, so last-writer-wins is harmless.
        self.plans.insert(schema.name.clone(), Arc::clone(&plan));
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldOptions;

    #[test]
    fn test_wire_type_selection() {
        assert_eq!(wire_for(&FieldType::Int64, None).unwrap(), WireType::Varint);
        assert_eq!(
            wire_for(&FieldType::Int64, Some(FixedWidth::Fixed32)).unwrap(),
            WireType::Fixed32
        );
        assert_eq!(wire_for(&FieldType::Float64, None).unwrap(), WireType::Fixed64);
        assert_eq!(wire_for(&FieldType::String, None).unwrap(), WireType::ByteLength);
        assert_eq!(
            wire_for(&FieldType::list(FieldType::optional(FieldType::Bytes)), None).unwrap(),
            WireType::ByteLength
        );
        assert_eq!(
            wire_for(&FieldType::list(FieldType::Int64), None).unwrap(),
            WireType::Varint
        );
        assert!(wire_for(&FieldType::Func, None).is_err());
        assert!(wire_for(&FieldType::Chan, None).is_err());
    }

    #[test]
    #[should_panic(expected = "map-kinded")]
    fn test_map_wire_type_panics() {
        let _ = wire_for(
            &FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::Int64)),
            None,
        );
    }

    #[test]
    fn test_plan_numbers_follow_declaration_order() {
        let schema = StructSchema::new("Planned")
            .field("s", FieldType::String)
            .field_with("n", FieldType::Int32, FieldOptions::new().write_empty())
            .field("bs", FieldType::Bytes);

        let cache = PlanCache::new();
        let plan = cache.plan_for(&schema).unwrap();
        assert_eq!(plan.fields.len(), 3);
        assert_eq!(plan.fields[0].number, 1);
        assert_eq!(plan.fields[1].number, 2);
        assert_eq!(plan.fields[2].number, 3);
        assert!(plan.fields[1].write_empty);
        assert_eq!(plan.fields[0].wire, WireType::ByteLength);
        assert_eq!(plan.fields[1].wire, WireType::Varint);

        // Second lookup hits the cache and returns the same plan.
        let again = cache.plan_for(&schema).unwrap();
        assert!(Arc::ptr_eq(&plan, &again));
    }
}
