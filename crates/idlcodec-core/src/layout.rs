//! Static layout queries over the type model.
//!
//! Borsh layouts are mostly variable-length, but many account headers are
//! not: a run of integers and public keys has a fixed byte offset, which is
//! what remote memcmp filters need.

use crate::error::CodecError;
use crate::schema::{Schema, SchemaRegistry, TypeDef, VariantFields};
use crate::types::IdlType;

/// Maximum nesting depth walked by layout queries and decoders.
pub const MAX_DEPTH: usize = 64;

/// Encoded size of `ty` if every value of the type has the same size.
pub fn fixed_size(ty: &IdlType, registry: &dyn SchemaRegistry) -> Option<usize> {
    fixed_size_at(ty, registry, 0)
}

fn fixed_size_at(ty: &IdlType, registry: &dyn SchemaRegistry, depth: usize) -> Option<usize> {
    if depth > MAX_DEPTH {
        return None;
    }
    match ty {
        IdlType::Uint(bits) | IdlType::Int(bits) => Some(usize::from(*bits) / 8),
        IdlType::Bool => Some(1),
        IdlType::FixedBytes(n) => Some(*n),
        IdlType::Pubkey => Some(32),
        IdlType::Bytes | IdlType::Str | IdlType::Vec(_) | IdlType::Option(_) => None,
        IdlType::Array { elem, len } => fixed_size_at(elem, registry, depth + 1)?.checked_mul(*len),
        IdlType::Defined(name) => match registry.type_def(name)? {
            TypeDef::Struct { fields } => fields.iter().try_fold(0usize, |acc, f| {
                acc.checked_add(fixed_size_at(&f.ty, registry, depth + 1)?)
            }),
            TypeDef::Enum { variants } => {
                let mut size = None;
                for variant in variants {
                    let payload = variant_fixed_size(&variant.fields, registry, depth + 1)?;
                    match size {
                        None => size = Some(payload),
                        Some(s) if s == payload => {}
                        Some(_) => return None,
                    }
                }
                Some(1 + size.unwrap_or(0))
            }
        },
    }
}

fn variant_fixed_size(
    fields: &VariantFields,
    registry: &dyn SchemaRegistry,
    depth: usize,
) -> Option<usize> {
    match fields {
        VariantFields::Unit => Some(0),
        VariantFields::Named(fields) => fields.iter().try_fold(0usize, |acc, f| {
            acc.checked_add(fixed_size_at(&f.ty, registry, depth)?)
        }),
        VariantFields::Tuple(types) => types.iter().try_fold(0usize, |acc, t| {
            acc.checked_add(fixed_size_at(t, registry, depth)?)
        }),
    }
}

/// Smallest number of bytes any valid encoding of `ty` occupies.
///
/// Decoders use this to reject length prefixes that the remaining input
/// could never satisfy, before allocating.
pub fn min_size(ty: &IdlType, registry: &dyn SchemaRegistry) -> usize {
    min_size_at(ty, registry, 0)
}

fn min_size_at(ty: &IdlType, registry: &dyn SchemaRegistry, depth: usize) -> usize {
    if depth > MAX_DEPTH {
        return 0;
    }
    match ty {
        IdlType::Uint(bits) | IdlType::Int(bits) => usize::from(*bits) / 8,
        IdlType::Bool => 1,
        IdlType::FixedBytes(n) => *n,
        IdlType::Pubkey => 32,
        IdlType::Bytes | IdlType::Str | IdlType::Vec(_) => 4,
        IdlType::Option(_) => 1,
        IdlType::Array { elem, len } => min_size_at(elem, registry, depth + 1).saturating_mul(*len),
        IdlType::Defined(name) => match registry.type_def(name) {
            None => 0,
            Some(TypeDef::Struct { fields }) => fields
                .iter()
                .map(|f| min_size_at(&f.ty, registry, depth + 1))
                .fold(0usize, usize::saturating_add),
            Some(TypeDef::Enum { variants }) => {
                let smallest = variants
                    .iter()
                    .map(|v| match &v.fields {
                        VariantFields::Unit => 0,
                        VariantFields::Named(fields) => fields
                            .iter()
                            .map(|f| min_size_at(&f.ty, registry, depth + 1))
                            .fold(0usize, usize::saturating_add),
                        VariantFields::Tuple(types) => types
                            .iter()
                            .map(|t| min_size_at(t, registry, depth + 1))
                            .fold(0usize, usize::saturating_add),
                    })
                    .min()
                    .unwrap_or(0);
                1 + smallest
            }
        },
    }
}

/// Absolute byte offset of a top-level field within an encoded record,
/// discriminator included. Fails if any earlier field is variable-sized.
pub fn field_offset(
    schema: &Schema,
    field: &str,
    registry: &dyn SchemaRegistry,
) -> Result<usize, CodecError> {
    let mut offset = schema.body_offset();
    for def in &schema.fields {
        if def.name == field {
            return Ok(offset);
        }
        let size = fixed_size(&def.ty, registry).ok_or_else(|| CodecError::NotFixedLayout {
            kind: schema.name.clone(),
            field: field.to_string(),
        })?;
        offset += size;
    }
    Err(CodecError::MissingField {
        field: format!("{}.{field}", schema.name),
    })
}
