//! Discriminators and the prefix matcher.
//!
//! A discriminator is the short tag in front of every Anchor account and
//! event. Matching it is enough to test membership without decoding, and the
//! same bytes, paired with an offset, become a remote memcmp filter so
//! non-matching accounts are never transferred at all.

use crate::error::CodecError;
use crate::layout;
use crate::pubkey::Pubkey;
use crate::schema::{RecordCategory, SchemaRegistry};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Default discriminator width used by Anchor for accounts and events.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Record-kind tag bytes.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Discriminator(pub Vec<u8>);

impl Discriminator {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Anchor derivation: `sha256("<namespace>:<Name>")[..width]`.
    pub fn anchor(category: RecordCategory, name: &str, width: usize) -> Self {
        let preimage = format!("{}:{name}", category.namespace());
        let hash = Sha256::digest(preimage.as_bytes());
        Self(hash[..width.min(hash.len())].to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    /// True if `data` carries this discriminator at `offset`.
    pub fn is_prefix_of(&self, data: &[u8], offset: usize) -> bool {
        slice_at(data, offset, self.0.len()) == Some(self.0.as_slice())
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Discriminator({})", self.to_hex())
    }
}

fn slice_at(data: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    data.get(offset..offset.checked_add(len)?)
}

/// A byte comparison at a fixed offset, in the shape RPC nodes accept:
/// `{"offset": 0, "bytes": "<base58>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemcmpFilter {
    pub offset: usize,
    #[serde(with = "base58_bytes")]
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    pub fn new(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Apply the filter locally.
    pub fn matches(&self, data: &[u8]) -> bool {
        slice_at(data, self.offset, self.bytes.len()) == Some(self.bytes.as_slice())
    }

    pub fn bytes_base58(&self) -> String {
        bs58::encode(&self.bytes).into_string()
    }
}

mod base58_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&bs58::encode(v).into_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        bs58::decode(&s).into_vec().map_err(de::Error::custom)
    }
}

/// Cheap membership tests and filter export, driven by the registry.
#[derive(Clone, Copy)]
pub struct Matcher<'r> {
    registry: &'r dyn SchemaRegistry,
}

impl<'r> Matcher<'r> {
    pub fn new(registry: &'r dyn SchemaRegistry) -> Self {
        Self { registry }
    }

    /// The discriminator bytes of `kind`.
    pub fn discriminator_of(&self, kind: &str) -> Result<&'r Discriminator, CodecError> {
        Ok(&self.registry.lookup(kind)?.discriminator)
    }

    /// True iff `data` is long enough and carries `kind`'s discriminator at
    /// the schema's offset. Unknown kinds never match.
    pub fn matches(&self, data: &[u8], kind: &str) -> bool {
        match self.registry.schema(kind) {
            Some(schema) => schema
                .discriminator
                .is_prefix_of(data, schema.discriminator_offset),
            None => false,
        }
    }

    /// Remote filter selecting every record of `kind`.
    pub fn memcmp(&self, kind: &str) -> Result<MemcmpFilter, CodecError> {
        let schema = self.registry.lookup(kind)?;
        Ok(MemcmpFilter::new(
            schema.discriminator_offset,
            schema.discriminator.as_bytes(),
        ))
    }

    /// Remote filter selecting records of `kind` whose top-level `field`
    /// equals `value` (raw encoded bytes of the field).
    pub fn field_filter(
        &self,
        kind: &str,
        field: &str,
        value: &[u8],
    ) -> Result<MemcmpFilter, CodecError> {
        let schema = self.registry.lookup(kind)?;
        let def = schema.field(field).ok_or_else(|| CodecError::MissingField {
            field: format!("{}.{field}", schema.name),
        })?;
        let offset = layout::field_offset(schema, field, self.registry)?;
        let size = layout::fixed_size(&def.ty, self.registry).ok_or_else(|| {
            CodecError::NotFixedLayout {
                kind: schema.name.clone(),
                field: field.to_string(),
            }
        })?;
        if value.len() != size {
            return Err(CodecError::TypeMismatch {
                field: field.to_string(),
                expected: format!("{} ({size} bytes)", def.ty),
                got: format!("{} bytes", value.len()),
            });
        }
        Ok(MemcmpFilter::new(offset, value))
    }

    /// Remote filter on a public-key field, e.g. `position.owner`.
    pub fn pubkey_filter(
        &self,
        kind: &str,
        field: &str,
        key: &Pubkey,
    ) -> Result<MemcmpFilter, CodecError> {
        self.field_filter(kind, field, key.as_bytes())
    }

    /// Which kind in `category` does `data` belong to, if any.
    pub fn identify(&self, data: &[u8], category: RecordCategory) -> Option<&'r str> {
        self.registry
            .schema_by_discriminator(category, data)
            .map(|s| s.name.as_str())
    }
}
