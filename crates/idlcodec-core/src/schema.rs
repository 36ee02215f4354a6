//! Schema types — the in-memory representation of a parsed IDL.

use crate::discriminator::Discriminator;
use crate::error::CodecError;
use crate::types::IdlType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which discriminator namespace a record kind lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordCategory {
    Account,
    Event,
}

impl RecordCategory {
    /// Anchor's hash namespace for derived discriminators.
    pub fn namespace(self) -> &'static str {
        match self {
            RecordCategory::Account => "account",
            RecordCategory::Event => "event",
        }
    }
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.namespace())
    }
}

/// A single named, typed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: IdlType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: IdlType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Payload shape of one enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "lowercase")]
pub enum VariantFields {
    Unit,
    Named(Vec<FieldDef>),
    Tuple(Vec<IdlType>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDef {
    pub name: String,
    pub fields: VariantFields,
}

/// A named user type: nested record or tagged enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDef {
    Struct { fields: Vec<FieldDef> },
    Enum { variants: Vec<VariantDef> },
}

/// A record kind: discriminator plus ordered field list.
///
/// Field order is the wire order and is never rearranged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Kind name as declared in the IDL, e.g. "Position"
    pub name: String,
    pub category: RecordCategory,
    pub discriminator: Discriminator,
    /// Byte offset of the discriminator inside the record (0 for Anchor)
    #[serde(default)]
    pub discriminator_offset: usize,
    /// Ordered field definitions
    pub fields: Vec<FieldDef>,
}

impl Schema {
    /// First byte after the discriminator; fields start here.
    pub fn body_offset(&self) -> usize {
        self.discriminator_offset + self.discriminator.len()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A thread-safe, read-only view of a schema registry.
///
/// The registry is built once; every method is a pure lookup.
/// Concrete implementations live in `idlcodec-registry`.
pub trait SchemaRegistry: Send + Sync {
    /// Look up a record kind by name.
    fn schema(&self, kind: &str) -> Option<&Schema>;

    /// Find the record kind in `category` whose discriminator prefixes `data`.
    fn schema_by_discriminator(&self, category: RecordCategory, data: &[u8]) -> Option<&Schema>;

    /// Resolve a `Defined` type reference.
    fn type_def(&self, name: &str) -> Option<&TypeDef>;

    /// All record kinds, accounts first, each in declaration order.
    fn schemas(&self) -> Vec<&Schema>;

    /// `schema()` with a typed miss.
    fn lookup(&self, kind: &str) -> Result<&Schema, CodecError> {
        self.schema(kind)
            .ok_or_else(|| CodecError::UnknownRecordKind {
                kind: kind.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_offset_accounts_for_header() {
        let schema = Schema {
            name: "Position".into(),
            category: RecordCategory::Account,
            discriminator: Discriminator::new(vec![1, 2, 3, 4, 5, 6, 7, 8]),
            discriminator_offset: 4,
            fields: vec![FieldDef::new("sizeUsd", IdlType::Uint(64))],
        };
        assert_eq!(schema.body_offset(), 12);
        assert!(schema.field("sizeUsd").is_some());
        assert!(schema.field("owner").is_none());
    }

    #[test]
    fn category_namespaces() {
        assert_eq!(RecordCategory::Account.namespace(), "account");
        assert_eq!(RecordCategory::Event.to_string(), "event");
    }
}
