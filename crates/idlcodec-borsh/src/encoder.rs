//! Schema-driven Borsh encoding, the inverse of `decoder`.

use borsh::BorshSerialize;
use idlcodec_core::{
    layout::MAX_DEPTH, CodecError, DecodedRecord, FieldDef, IdlType, Schema, SchemaRegistry,
    TypeDef, Value, VariantFields,
};
use indexmap::IndexMap;

/// Encode `record` as `schema`: zeroed header up to the discriminator
/// offset, the discriminator, then every schema field in order.
pub(crate) fn encode_record(
    registry: &dyn SchemaRegistry,
    schema: &Schema,
    record: &DecodedRecord,
) -> Result<Vec<u8>, CodecError> {
    let mut out = vec![0u8; schema.discriminator_offset];
    out.extend_from_slice(schema.discriminator.as_bytes());
    encode_fields(&schema.fields, &record.fields, registry, &mut out, 0)?;
    Ok(out)
}

fn encode_fields(
    defs: &[FieldDef],
    values: &IndexMap<String, Value>,
    registry: &dyn SchemaRegistry,
    out: &mut Vec<u8>,
    depth: usize,
) -> Result<(), CodecError> {
    for def in defs {
        let value = values.get(&def.name).ok_or_else(|| CodecError::MissingField {
            field: def.name.clone(),
        })?;
        encode_value(&def.ty, value, registry, out, depth).map_err(|e| e.within(&def.name))?;
    }
    Ok(())
}

/// Append the encoding of `value` as `ty`.
pub(crate) fn encode_value(
    ty: &IdlType,
    value: &Value,
    registry: &dyn SchemaRegistry,
    out: &mut Vec<u8>,
    depth: usize,
) -> Result<(), CodecError> {
    if depth > MAX_DEPTH {
        return Err(overflow(format!("nesting deeper than {MAX_DEPTH} levels")));
    }

    match (ty, value) {
        (IdlType::Uint(bits), Value::Uint(v)) => put_uint(*bits, *v, out),
        (IdlType::Int(bits), Value::Int(v)) => put_int(*bits, *v, out),
        (IdlType::Bool, Value::Bool(b)) => put(b, out),
        (IdlType::FixedBytes(n), Value::Bytes(bytes)) => {
            if bytes.len() != *n {
                return Err(overflow(format!("expected {n} bytes, got {}", bytes.len())));
            }
            out.extend_from_slice(bytes);
            Ok(())
        }
        (IdlType::Bytes, Value::Bytes(bytes)) => {
            put_len(bytes.len(), out)?;
            out.extend_from_slice(bytes);
            Ok(())
        }
        (IdlType::Str, Value::Str(text)) => {
            put_len(text.len(), out)?;
            out.extend_from_slice(text.as_bytes());
            Ok(())
        }
        (IdlType::Pubkey, Value::Pubkey(key)) => {
            out.extend_from_slice(key.as_bytes());
            Ok(())
        }
        (IdlType::Array { elem, len }, Value::Array(items)) => {
            if items.len() != *len {
                return Err(overflow(format!(
                    "expected {len} elements, got {}",
                    items.len()
                )));
            }
            encode_items(elem, items, registry, out, depth)
        }
        (IdlType::Vec(elem), Value::Array(items)) => {
            put_len(items.len(), out)?;
            encode_items(elem, items, registry, out, depth)
        }
        (IdlType::Option(_), Value::Null) => {
            out.push(0);
            Ok(())
        }
        (IdlType::Option(inner), some) => {
            out.push(1);
            encode_value(inner, some, registry, out, depth + 1)
        }
        (IdlType::Defined(name), value) => {
            let def = registry
                .type_def(name)
                .ok_or_else(|| mismatch(ty, value))?;
            encode_defined(ty, def, value, registry, out, depth + 1)
        }
        (ty, value) => Err(mismatch(ty, value)),
    }
}

fn encode_items(
    elem: &IdlType,
    items: &[Value],
    registry: &dyn SchemaRegistry,
    out: &mut Vec<u8>,
    depth: usize,
) -> Result<(), CodecError> {
    for (i, item) in items.iter().enumerate() {
        encode_value(elem, item, registry, out, depth + 1)
            .map_err(|e| e.within(&format!("[{i}]")))?;
    }
    Ok(())
}

fn encode_defined(
    ty: &IdlType,
    def: &TypeDef,
    value: &Value,
    registry: &dyn SchemaRegistry,
    out: &mut Vec<u8>,
    depth: usize,
) -> Result<(), CodecError> {
    match (def, value) {
        (TypeDef::Struct { fields }, Value::Struct(values)) => {
            encode_fields(fields, values, registry, out, depth)
        }
        (TypeDef::Enum { variants }, Value::Enum { variant, fields }) => {
            let (tag, def) = variants
                .iter()
                .enumerate()
                .find(|(_, v)| &v.name == variant)
                .ok_or_else(|| CodecError::TypeMismatch {
                    field: String::new(),
                    expected: format!("variant of {ty}"),
                    got: variant.clone(),
                })?;
            let tag = u8::try_from(tag)
                .map_err(|_| overflow(format!("variant index {tag} exceeds u8")))?;
            out.push(tag);
            match &def.fields {
                VariantFields::Unit => Ok(()),
                VariantFields::Named(defs) => encode_fields(defs, fields, registry, out, depth),
                VariantFields::Tuple(tys) => {
                    for (i, ty) in tys.iter().enumerate() {
                        let key = i.to_string();
                        let value = fields
                            .get(&key)
                            .ok_or_else(|| CodecError::MissingField { field: key.clone() })?;
                        encode_value(ty, value, registry, out, depth).map_err(|e| e.within(&key))?;
                    }
                    Ok(())
                }
            }
        }
        (_, value) => Err(mismatch(ty, value)),
    }
}

fn put<T: BorshSerialize>(v: &T, out: &mut Vec<u8>) -> Result<(), CodecError> {
    v.serialize(out).map_err(|e| overflow(e.to_string()))
}

fn put_len(len: usize, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let len = u32::try_from(len).map_err(|_| overflow(format!("length {len} exceeds u32")))?;
    put(&len, out)
}

fn put_uint(bits: u16, v: u128, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let too_wide = || overflow(format!("{v} does not fit in u{bits}"));
    match bits {
        8 => put(&u8::try_from(v).map_err(|_| too_wide())?, out),
        16 => put(&u16::try_from(v).map_err(|_| too_wide())?, out),
        32 => put(&u32::try_from(v).map_err(|_| too_wide())?, out),
        64 => put(&u64::try_from(v).map_err(|_| too_wide())?, out),
        128 => put(&v, out),
        other => Err(overflow(format!("unsupported integer width {other}"))),
    }
}

fn put_int(bits: u16, v: i128, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let too_wide = || overflow(format!("{v} does not fit in i{bits}"));
    match bits {
        8 => put(&i8::try_from(v).map_err(|_| too_wide())?, out),
        16 => put(&i16::try_from(v).map_err(|_| too_wide())?, out),
        32 => put(&i32::try_from(v).map_err(|_| too_wide())?, out),
        64 => put(&i64::try_from(v).map_err(|_| too_wide())?, out),
        128 => put(&v, out),
        other => Err(overflow(format!("unsupported integer width {other}"))),
    }
}

fn overflow(reason: String) -> CodecError {
    CodecError::EncodeOverflow {
        field: String::new(),
        reason,
    }
}

fn mismatch(ty: &IdlType, value: &Value) -> CodecError {
    CodecError::TypeMismatch {
        field: String::new(),
        expected: ty.to_string(),
        got: value.type_name().to_string(),
    }
}
