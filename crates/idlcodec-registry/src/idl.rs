//! Anchor IDL parser.
//!
//! Two generations of the Anchor IDL JSON are accepted:
//!
//! ```json
//! // legacy (anchor < 0.30): layouts inline, derived discriminators
//! { "name": "perpetuals",
//!   "accounts": [{ "name": "Position", "type": { "kind": "struct", "fields": [
//!       { "name": "owner", "type": "publicKey" },
//!       { "name": "side",  "type": { "defined": "Side" } } ] } }],
//!   "events": [{ "name": "X", "fields": [{ "name": "a", "type": "u64", "index": false }] }] }
//!
//! // current: explicit discriminators, layouts under "types"
//! { "address": "...", "metadata": { "name": "perpetuals" },
//!   "accounts": [{ "name": "Position", "discriminator": [170, 188, ...] }],
//!   "types": [{ "name": "Position", "type": { "kind": "struct", "fields": [
//!       { "name": "owner", "type": "pubkey" },
//!       { "name": "side",  "type": { "defined": { "name": "Side" } } } ] } }] }
//! ```
//!
//! The parser only converts; cross-reference checks happen when the
//! registry is built.

use std::str::FromStr;

use idlcodec_core::{
    error::RegistryError, Discriminator, FieldDef, IdlType, Pubkey, RecordCategory, Schema,
    TypeDef, VariantDef, VariantFields,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::config::RegistryConfig;

// ─── Raw serde shapes ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IdlRaw {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    metadata: Option<MetadataRaw>,
    #[serde(default)]
    accounts: Vec<AccountRaw>,
    #[serde(default)]
    events: Vec<EventRaw>,
    #[serde(default)]
    types: Vec<TypeDefRaw>,
}

#[derive(Debug, Deserialize)]
struct MetadataRaw {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountRaw {
    name: String,
    #[serde(default)]
    discriminator: Option<Vec<u8>>,
    #[serde(rename = "type", default)]
    layout: Option<TypeBodyRaw>,
}

#[derive(Debug, Deserialize)]
struct EventRaw {
    name: String,
    #[serde(default)]
    discriminator: Option<Vec<u8>>,
    #[serde(default)]
    fields: Option<Vec<FieldRaw>>,
}

#[derive(Debug, Deserialize)]
struct TypeDefRaw {
    name: String,
    #[serde(rename = "type")]
    body: TypeBodyRaw,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum TypeBodyRaw {
    Struct {
        #[serde(default)]
        fields: Vec<FieldRaw>,
    },
    Enum {
        variants: Vec<VariantRaw>,
    },
}

/// Struct and variant members are either `{name, type}` or a bare type.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldRaw {
    Named {
        name: String,
        #[serde(rename = "type")]
        ty: Json,
    },
    Positional(Json),
}

#[derive(Debug, Deserialize)]
struct VariantRaw {
    name: String,
    #[serde(default)]
    fields: Option<Vec<FieldRaw>>,
}

// ─── Parsed output ────────────────────────────────────────────────────────────

/// Program identity as declared by the IDL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub address: Option<Pubkey>,
}

/// Everything the registry needs from one IDL document.
#[derive(Debug, Clone)]
pub struct ParsedIdl {
    pub program: ProgramInfo,
    /// Accounts first, then events, each in declaration order
    pub schemas: Vec<Schema>,
    /// Named types in declaration order; account layouts are included so
    /// other types may reference them
    pub types: Vec<(String, TypeDef)>,
}

/// Parses Anchor IDL JSON into schemas and type definitions.
pub struct IdlParser;

impl IdlParser {
    /// Parse an IDL document.
    pub fn parse(json: &str, config: &RegistryConfig) -> Result<ParsedIdl, RegistryError> {
        let raw: IdlRaw = serde_json::from_str(json)?;
        Self::convert(raw, config)
    }

    /// Parse an already-loaded JSON value.
    pub fn parse_value(value: Json, config: &RegistryConfig) -> Result<ParsedIdl, RegistryError> {
        let raw: IdlRaw = serde_json::from_value(value)?;
        Self::convert(raw, config)
    }

    fn convert(raw: IdlRaw, config: &RegistryConfig) -> Result<ParsedIdl, RegistryError> {
        if config.discriminator_len == 0 || config.discriminator_len > 32 {
            return Err(RegistryError::ValidationFailed {
                reason: format!(
                    "discriminator width must be 1..=32 bytes, got {}",
                    config.discriminator_len
                ),
            });
        }

        let program = program_info(&raw)?;

        let mut types = Vec::with_capacity(raw.types.len());
        for def in &raw.types {
            types.push((def.name.clone(), convert_body(&def.name, &def.body)?));
        }

        let mut schemas = Vec::with_capacity(raw.accounts.len() + raw.events.len());

        for account in &raw.accounts {
            let fields = match &account.layout {
                Some(body) => {
                    let def = convert_body(&account.name, body)?;
                    if !types.iter().any(|(n, _)| n == &account.name) {
                        types.push((account.name.clone(), def.clone()));
                    }
                    record_fields(&account.name, &def)?
                }
                None => {
                    let def = find_type(&types, &account.name)?;
                    record_fields(&account.name, def)?
                }
            };
            schemas.push(Schema {
                name: account.name.clone(),
                category: RecordCategory::Account,
                discriminator: discriminator(
                    RecordCategory::Account,
                    &account.name,
                    account.discriminator.as_deref(),
                    config,
                ),
                discriminator_offset: config.account_discriminator_offset,
                fields,
            });
        }

        for event in &raw.events {
            let fields = match &event.fields {
                Some(raw_fields) => named_fields(&event.name, raw_fields)?,
                None => record_fields(&event.name, find_type(&types, &event.name)?)?,
            };
            schemas.push(Schema {
                name: event.name.clone(),
                category: RecordCategory::Event,
                discriminator: discriminator(
                    RecordCategory::Event,
                    &event.name,
                    event.discriminator.as_deref(),
                    config,
                ),
                discriminator_offset: 0,
                fields,
            });
        }

        Ok(ParsedIdl {
            program,
            schemas,
            types,
        })
    }
}

fn program_info(raw: &IdlRaw) -> Result<ProgramInfo, RegistryError> {
    let meta = raw.metadata.as_ref();
    let address = raw
        .address
        .as_deref()
        .or_else(|| meta.and_then(|m| m.address.as_deref()));
    let address = match address {
        Some(text) => Some(
            Pubkey::from_str(text)
                .map_err(|e| RegistryError::Parse(format!("program address: {e}")))?,
        ),
        None => None,
    };
    Ok(ProgramInfo {
        name: raw
            .name
            .clone()
            .or_else(|| meta.and_then(|m| m.name.clone())),
        version: raw
            .version
            .clone()
            .or_else(|| meta.and_then(|m| m.version.clone())),
        address,
    })
}

fn discriminator(
    category: RecordCategory,
    name: &str,
    explicit: Option<&[u8]>,
    config: &RegistryConfig,
) -> Discriminator {
    match explicit {
        Some(bytes) => Discriminator::new(bytes),
        None => Discriminator::anchor(category, name, config.discriminator_len),
    }
}

fn find_type<'a>(types: &'a [(String, TypeDef)], name: &str) -> Result<&'a TypeDef, RegistryError> {
    types
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, def)| def)
        .ok_or_else(|| RegistryError::UnresolvedType {
            name: name.to_string(),
            context: format!("layout of '{name}'"),
        })
}

/// A record's layout must be a struct.
fn record_fields(name: &str, def: &TypeDef) -> Result<Vec<FieldDef>, RegistryError> {
    match def {
        TypeDef::Struct { fields } => Ok(fields.clone()),
        TypeDef::Enum { .. } => Err(RegistryError::ValidationFailed {
            reason: format!("record '{name}' must have a struct layout"),
        }),
    }
}

fn convert_body(owner: &str, body: &TypeBodyRaw) -> Result<TypeDef, RegistryError> {
    match body {
        TypeBodyRaw::Struct { fields } => Ok(TypeDef::Struct {
            fields: struct_fields(owner, fields)?,
        }),
        TypeBodyRaw::Enum { variants } => {
            let mut out = Vec::with_capacity(variants.len());
            for v in variants {
                let ctx = format!("{owner}::{}", v.name);
                let fields = match v.fields.as_deref() {
                    None | Some([]) => VariantFields::Unit,
                    Some(list) if list.iter().all(|f| matches!(f, FieldRaw::Named { .. })) => {
                        VariantFields::Named(named_fields(&ctx, list)?)
                    }
                    Some(list) => {
                        let mut tys = Vec::with_capacity(list.len());
                        for (i, f) in list.iter().enumerate() {
                            match f {
                                FieldRaw::Positional(ty) => {
                                    tys.push(parse_type(ty, &format!("{ctx}.{i}"))?)
                                }
                                FieldRaw::Named { .. } => {
                                    return Err(RegistryError::Parse(format!(
                                        "variant {ctx} mixes named and positional fields"
                                    )))
                                }
                            }
                        }
                        VariantFields::Tuple(tys)
                    }
                };
                out.push(VariantDef {
                    name: v.name.clone(),
                    fields,
                });
            }
            Ok(TypeDef::Enum { variants: out })
        }
    }
}

/// Struct members; positional members are named by index.
fn struct_fields(owner: &str, raw: &[FieldRaw]) -> Result<Vec<FieldDef>, RegistryError> {
    raw.iter()
        .enumerate()
        .map(|(i, f)| match f {
            FieldRaw::Named { name, ty } => {
                Ok(FieldDef::new(name, parse_type(ty, &format!("{owner}.{name}"))?))
            }
            FieldRaw::Positional(ty) => Ok(FieldDef::new(
                i.to_string(),
                parse_type(ty, &format!("{owner}.{i}"))?,
            )),
        })
        .collect()
}

fn named_fields(owner: &str, raw: &[FieldRaw]) -> Result<Vec<FieldDef>, RegistryError> {
    raw.iter()
        .map(|f| match f {
            FieldRaw::Named { name, ty } => {
                Ok(FieldDef::new(name, parse_type(ty, &format!("{owner}.{name}"))?))
            }
            FieldRaw::Positional(_) => Err(RegistryError::Parse(format!(
                "'{owner}' requires named fields"
            ))),
        })
        .collect()
}

/// Convert an IDL type expression.
pub fn parse_type(ty: &Json, context: &str) -> Result<IdlType, RegistryError> {
    let unknown = || RegistryError::UnknownType {
        ty: ty.to_string(),
        context: context.to_string(),
    };

    match ty {
        Json::String(s) => parse_primitive(s).ok_or_else(unknown),
        Json::Object(map) => {
            if let Some(inner) = map.get("vec") {
                return Ok(IdlType::vec(parse_type(inner, context)?));
            }
            if let Some(inner) = map.get("option") {
                return Ok(IdlType::option(parse_type(inner, context)?));
            }
            if let Some(arr) = map.get("array") {
                let (elem, len) = match arr.as_array().map(Vec::as_slice) {
                    Some([elem, len]) => (elem, len.as_u64().ok_or_else(unknown)?),
                    _ => return Err(unknown()),
                };
                let len = usize::try_from(len).map_err(|_| unknown())?;
                let elem = parse_type(elem, context)?;
                return Ok(match elem {
                    IdlType::Uint(8) => IdlType::FixedBytes(len),
                    other => IdlType::array(other, len),
                });
            }
            if let Some(defined) = map.get("defined") {
                return match defined {
                    Json::String(name) => Ok(IdlType::defined(name.as_str())),
                    Json::Object(d) => {
                        if d.get("generics").is_some_and(|g| g.as_array().is_some_and(|a| !a.is_empty())) {
                            return Err(unknown());
                        }
                        match d.get("name") {
                            Some(Json::String(name)) => Ok(IdlType::defined(name.as_str())),
                            _ => Err(unknown()),
                        }
                    }
                    _ => Err(unknown()),
                };
            }
            Err(unknown())
        }
        _ => Err(unknown()),
    }
}

fn parse_primitive(s: &str) -> Option<IdlType> {
    let ty = match s {
        "bool" => IdlType::Bool,
        "string" => IdlType::Str,
        "bytes" => IdlType::Bytes,
        "publicKey" | "pubkey" => IdlType::Pubkey,
        _ if s.starts_with('u') => IdlType::Uint(s[1..].parse().ok()?),
        _ if s.starts_with('i') => IdlType::Int(s[1..].parse().ok()?),
        _ => return None,
    };
    Some(ty)
}
