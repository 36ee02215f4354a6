//! Raw and decoded record types.

use crate::error::CodecError;
use crate::pubkey::Pubkey;
use crate::schema::RecordCategory;
use crate::types::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An undecoded record as captured from the network collaborator.
/// This is the input to every decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Account data or event bytes, discriminator included
    #[serde(with = "hex_text")]
    pub data: Vec<u8>,
    pub category: RecordCategory,
    /// Expected kind; when absent the decoder resolves it by discriminator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Account address the bytes were read from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Pubkey>,
}

impl RawRecord {
    pub fn account(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            category: RecordCategory::Account,
            kind: None,
            address: None,
        }
    }

    pub fn event(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            category: RecordCategory::Event,
            kind: None,
            address: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_address(mut self, address: Pubkey) -> Self {
        self.address = Some(address);
        self
    }
}

/// A fully decoded record — the primary output of IDLCodec.
///
/// Records are values: a fresh account snapshot produces a fresh record,
/// never a patch of an old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedRecord {
    /// Matched kind name, e.g. "Position"
    pub kind: String,
    pub category: RecordCategory,
    /// Decoded field values in schema order
    pub fields: IndexMap<String, Value>,
}

impl DecodedRecord {
    pub fn new(kind: impl Into<String>, category: RecordCategory) -> Self {
        Self {
            kind: kind.into(),
            category,
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field insertion, preserving call order.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field value by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Follow a dotted path through nested structs, e.g. `"assets.owned"`.
    pub fn path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Struct(map) => map.get(part)?,
                Value::Enum { fields, .. } => fields.get(part)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Checked `u64` read of a field.
    pub fn get_u64(&self, path: &str) -> Result<u64, CodecError> {
        self.require(path)?.to_u64().map_err(|e| e.within(path))
    }

    /// Checked `i64` read of a field.
    pub fn get_i64(&self, path: &str) -> Result<i64, CodecError> {
        self.require(path)?.to_i64().map_err(|e| e.within(path))
    }

    fn require(&self, path: &str) -> Result<&Value, CodecError> {
        self.path(path).ok_or_else(|| CodecError::MissingField {
            field: path.to_string(),
        })
    }
}

mod hex_text {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(de::Error::custom)
    }
}
