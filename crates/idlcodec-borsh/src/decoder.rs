//! Schema-driven Borsh decoding.

use idlcodec_core::{
    layout::{self, MAX_DEPTH},
    CodecError, DecodedRecord, FieldDef, IdlType, Pubkey, Schema, SchemaRegistry, TypeDef, Value,
    VariantFields,
};
use indexmap::IndexMap;

use crate::reader::Reader;

/// Path label for errors in the record header.
pub(crate) const DISCRIMINATOR_FIELD: &str = "<discriminator>";

/// Decode one record against `schema`. Trailing bytes are ignored.
pub(crate) fn decode_record(
    registry: &dyn SchemaRegistry,
    schema: &Schema,
    data: &[u8],
) -> Result<DecodedRecord, CodecError> {
    let body = schema.body_offset();
    if data.len() < body {
        return Err(CodecError::Truncated {
            field: DISCRIMINATOR_FIELD.to_string(),
            offset: 0,
            needed: body,
            available: data.len(),
        });
    }
    if !schema
        .discriminator
        .is_prefix_of(data, schema.discriminator_offset)
    {
        return Err(CodecError::DiscriminatorMismatch {
            kind: schema.name.clone(),
            expected: schema.discriminator.to_hex(),
            found: format!("0x{}", hex::encode(&data[schema.discriminator_offset..body])),
        });
    }

    let mut reader = Reader::new(data, body);
    let fields = decode_fields(&schema.fields, &mut reader, registry, 0)?;

    if reader.remaining() > 0 {
        tracing::trace!(
            kind = %schema.name,
            trailing = reader.remaining(),
            "ignoring trailing bytes"
        );
    }

    Ok(DecodedRecord {
        kind: schema.name.clone(),
        category: schema.category,
        fields,
    })
}

fn decode_fields(
    defs: &[FieldDef],
    r: &mut Reader<'_>,
    registry: &dyn SchemaRegistry,
    depth: usize,
) -> Result<IndexMap<String, Value>, CodecError> {
    let mut out = IndexMap::with_capacity(defs.len());
    for def in defs {
        let value = decode_value(&def.ty, r, registry, depth).map_err(|e| e.within(&def.name))?;
        out.insert(def.name.clone(), value);
    }
    Ok(out)
}

/// Decode one value of type `ty` at the reader's position.
pub(crate) fn decode_value(
    ty: &IdlType,
    r: &mut Reader<'_>,
    registry: &dyn SchemaRegistry,
    depth: usize,
) -> Result<Value, CodecError> {
    if depth > MAX_DEPTH {
        return Err(CodecError::FieldDecode {
            field: String::new(),
            reason: format!("nesting deeper than {MAX_DEPTH} levels"),
        });
    }

    match ty {
        IdlType::Uint(bits) => r.read_uint(*bits).map(Value::Uint),
        IdlType::Int(bits) => r.read_int(*bits).map(Value::Int),
        IdlType::Bool => r.read::<bool>(1).map(Value::Bool),
        IdlType::FixedBytes(n) => Ok(Value::Bytes(r.take(*n)?.to_vec())),
        IdlType::Bytes => {
            let len = r.read_len()?;
            Ok(Value::Bytes(r.take(len)?.to_vec()))
        }
        IdlType::Str => {
            let len = r.read_len()?;
            let at = r.position();
            let bytes = r.take(len)?;
            let text = std::str::from_utf8(bytes).map_err(|e| CodecError::FieldDecode {
                field: String::new(),
                reason: format!("offset {at}: invalid UTF-8: {e}"),
            })?;
            Ok(Value::Str(text.to_string()))
        }
        IdlType::Pubkey => {
            let bytes = r.take(Pubkey::LEN)?;
            let key = Pubkey::try_from_slice(bytes).ok_or_else(|| CodecError::FieldDecode {
                field: String::new(),
                reason: "public key is not 32 bytes".into(),
            })?;
            Ok(Value::Pubkey(key))
        }
        IdlType::Array { elem, len } => {
            decode_seq(elem, *len, r, registry, depth).map(Value::Array)
        }
        IdlType::Vec(elem) => {
            let len = r.read_len()?;
            decode_seq(elem, len, r, registry, depth).map(Value::Array)
        }
        IdlType::Option(inner) => {
            let at = r.position();
            match r.read_u8()? {
                0 => Ok(Value::Null),
                1 => decode_value(inner, r, registry, depth + 1),
                tag => Err(CodecError::FieldDecode {
                    field: String::new(),
                    reason: format!("offset {at}: invalid option tag {tag}"),
                }),
            }
        }
        IdlType::Defined(name) => {
            let def = registry.type_def(name).ok_or_else(|| CodecError::FieldDecode {
                field: String::new(),
                reason: format!("type '{name}' is not defined"),
            })?;
            decode_defined(name, def, r, registry, depth + 1)
        }
    }
}

fn decode_seq(
    elem: &IdlType,
    len: usize,
    r: &mut Reader<'_>,
    registry: &dyn SchemaRegistry,
    depth: usize,
) -> Result<Vec<Value>, CodecError> {
    let min_each = layout::min_size(elem, registry);
    // A zero-width element lets the length prefix alone drive the loop.
    if min_each == 0 && len > 0 {
        return Err(CodecError::FieldDecode {
            field: String::new(),
            reason: format!(
                "offset {}: sequence of {len} zero-sized elements",
                r.position()
            ),
        });
    }
    r.ensure_room(len, min_each)?;
    let mut items = Vec::with_capacity(len);
    for i in 0..len {
        let item = decode_value(elem, r, registry, depth + 1)
            .map_err(|e| e.within(&format!("[{i}]")))?;
        items.push(item);
    }
    Ok(items)
}

fn decode_defined(
    name: &str,
    def: &TypeDef,
    r: &mut Reader<'_>,
    registry: &dyn SchemaRegistry,
    depth: usize,
) -> Result<Value, CodecError> {
    match def {
        TypeDef::Struct { fields } => decode_fields(fields, r, registry, depth).map(Value::Struct),
        TypeDef::Enum { variants } => {
            let at = r.position();
            let tag = r.read_u8()?;
            let variant = variants
                .get(usize::from(tag))
                .ok_or_else(|| CodecError::FieldDecode {
                    field: String::new(),
                    reason: format!(
                        "offset {at}: variant tag {tag} out of range for {name} ({} variants)",
                        variants.len()
                    ),
                })?;
            let fields = match &variant.fields {
                VariantFields::Unit => IndexMap::new(),
                VariantFields::Named(defs) => decode_fields(defs, r, registry, depth)?,
                VariantFields::Tuple(tys) => {
                    let mut out = IndexMap::with_capacity(tys.len());
                    for (i, ty) in tys.iter().enumerate() {
                        let key = i.to_string();
                        let value = decode_value(ty, r, registry, depth).map_err(|e| e.within(&key))?;
                        out.insert(key, value);
                    }
                    out
                }
            };
            Ok(Value::Enum {
                variant: variant.name.clone(),
                fields,
            })
        }
    }
}
