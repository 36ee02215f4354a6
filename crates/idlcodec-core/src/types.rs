//! IDL type model and decoded values.
//!
//! `IdlType` is the closed, recursive set of field types an Anchor IDL can
//! declare. `Value` is what a field decodes to. Integers of every declared
//! width are carried at full 128-bit precision so that no on-chain amount is
//! ever rounded; narrowing to a machine width is explicit and checked.

use crate::error::CodecError;
use crate::pubkey::Pubkey;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer widths accepted for `Uint` / `Int`.
pub const INT_WIDTHS: [u16; 5] = [8, 16, 32, 64, 128];

/// IDLCodec's field type system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdlType {
    // --- Integer types ---
    /// Unsigned little-endian integer. Width in bits.
    Uint(u16),
    /// Signed little-endian (two's complement) integer. Width in bits.
    Int(u16),
    /// One byte, 0 or 1
    Bool,

    // --- Byte types ---
    /// Fixed-length byte array, no prefix
    FixedBytes(usize),
    /// u32 length prefix + raw bytes
    Bytes,
    /// u32 length prefix + UTF-8
    Str,
    /// 32-byte public key
    Pubkey,

    // --- Composite types ---
    /// Fixed-count array of a type, no prefix
    Array { elem: Box<IdlType>, len: usize },
    /// u32 length prefix + elements
    Vec(Box<IdlType>),
    /// One tag byte (0 = none, 1 = some) + payload
    Option(Box<IdlType>),
    /// Reference to a named struct or enum in the registry
    Defined(String),
}

impl IdlType {
    pub fn vec(elem: IdlType) -> Self {
        IdlType::Vec(Box::new(elem))
    }

    pub fn option(inner: IdlType) -> Self {
        IdlType::Option(Box::new(inner))
    }

    pub fn array(elem: IdlType, len: usize) -> Self {
        IdlType::Array {
            elem: Box::new(elem),
            len,
        }
    }

    pub fn defined(name: impl Into<String>) -> Self {
        IdlType::Defined(name.into())
    }
}

impl fmt::Display for IdlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdlType::Uint(bits) => write!(f, "u{bits}"),
            IdlType::Int(bits) => write!(f, "i{bits}"),
            IdlType::Bool => write!(f, "bool"),
            IdlType::FixedBytes(n) => write!(f, "[u8; {n}]"),
            IdlType::Bytes => write!(f, "bytes"),
            IdlType::Str => write!(f, "string"),
            IdlType::Pubkey => write!(f, "pubkey"),
            IdlType::Array { elem, len } => write!(f, "[{elem}; {len}]"),
            IdlType::Vec(elem) => write!(f, "Vec<{elem}>"),
            IdlType::Option(inner) => write!(f, "Option<{inner}>"),
            IdlType::Defined(name) => write!(f, "{name}"),
        }
    }
}

/// A decoded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Any unsigned width, serialised as a decimal string
    Uint(#[serde(with = "dec_u128")] u128),
    /// Any signed width, serialised as a decimal string
    Int(#[serde(with = "dec_i128")] i128),
    Bool(bool),
    /// Fixed or variable byte string, serialised as hex
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
    Str(String),
    Pubkey(Pubkey),
    Array(Vec<Value>),
    Struct(IndexMap<String, Value>),
    /// Tagged enumeration; tuple payloads are keyed "0", "1", ...
    Enum {
        variant: String,
        fields: IndexMap<String, Value>,
    },
    /// An absent `Option`
    Null,
}

impl Value {
    /// A payload-less enum variant.
    pub fn unit_variant(variant: impl Into<String>) -> Self {
        Value::Enum {
            variant: variant.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Value::Uint(v) => Some(*v),
            Value::Int(v) => u128::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i128::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_pubkey(&self) -> Option<&Pubkey> {
        match self {
            Value::Pubkey(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Struct(m) => Some(m),
            _ => None,
        }
    }

    /// Checked narrowing to `u64`.
    pub fn to_u64(&self) -> Result<u64, CodecError> {
        let wide = self.as_u128().ok_or_else(|| self.not_an_integer("u64"))?;
        u64::try_from(wide).map_err(|_| CodecError::FieldDecode {
            field: String::new(),
            reason: format!("{wide} does not fit in u64"),
        })
    }

    /// Checked narrowing to `i64`.
    pub fn to_i64(&self) -> Result<i64, CodecError> {
        let wide = self.as_i128().ok_or_else(|| self.not_an_integer("i64"))?;
        i64::try_from(wide).map_err(|_| CodecError::FieldDecode {
            field: String::new(),
            reason: format!("{wide} does not fit in i64"),
        })
    }

    fn not_an_integer(&self, target: &str) -> CodecError {
        CodecError::TypeMismatch {
            field: String::new(),
            expected: target.to_string(),
            got: self.type_name().to_string(),
        }
    }

    /// Short name of the value's variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Uint(_) => "uint",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "string",
            Value::Pubkey(_) => "pubkey",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Enum { .. } => "enum",
            Value::Null => "null",
        }
    }
}

macro_rules! value_from {
    ($variant:ident: $($t:ty),+) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v.into())
            }
        })+
    };
}

value_from!(Uint: u8, u16, u32, u64, u128);
value_from!(Int: i8, i16, i32, i64, i128);
value_from!(Bool: bool);
value_from!(Pubkey: Pubkey);
value_from!(Str: String, &str);
value_from!(Bytes: Vec<u8>);

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uint(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Pubkey(k) => write!(f, "{k}"),
            Value::Array(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Struct(fields) => {
                let parts: Vec<_> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Enum { variant, fields } if fields.is_empty() => write!(f, "{variant}"),
            Value::Enum { variant, fields } => {
                let parts: Vec<_> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{variant} {{{}}}", parts.join(", "))
            }
            Value::Null => write!(f, "null"),
        }
    }
}

mod dec_u128 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(de::Error::custom)
    }
}

mod dec_i128 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &i128, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i128, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(de::Error::custom)
    }
}

mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idl_type_display() {
        assert_eq!(IdlType::Uint(64).to_string(), "u64");
        assert_eq!(IdlType::FixedBytes(32).to_string(), "[u8; 32]");
        assert_eq!(IdlType::vec(IdlType::Pubkey).to_string(), "Vec<pubkey>");
        assert_eq!(
            IdlType::option(IdlType::defined("Side")).to_string(),
            "Option<Side>"
        );
    }

    #[test]
    fn wide_integers_serialise_as_strings() {
        let val = Value::Uint(u128::MAX);
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(
            json,
            r#"{"type":"uint","value":"340282366920938463463374607431768211455"}"#
        );
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, val);
    }

    #[test]
    fn value_serde_roundtrip_nested() {
        let mut fields = IndexMap::new();
        fields.insert("owner".to_string(), Value::Pubkey(Pubkey::new([1; 32])));
        fields.insert("pnl".to_string(), Value::Int(-42));
        fields.insert("tag".to_string(), Value::Bytes(vec![0xde, 0xad]));
        let val = Value::Struct(fields);
        let json = serde_json::to_string(&val).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(val, back);
    }

    #[test]
    fn checked_narrowing() {
        assert_eq!(Value::Uint(u64::MAX as u128).to_u64().unwrap(), u64::MAX);
        let err = Value::Uint(u64::MAX as u128 + 1).to_u64().unwrap_err();
        assert!(matches!(err, CodecError::FieldDecode { .. }));
        assert_eq!(Value::Int(-5).to_i64().unwrap(), -5);
        assert!(Value::Int(-5).to_u64().is_err());
        assert!(matches!(
            Value::Str("1".into()).to_u64(),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn enum_display() {
        assert_eq!(Value::unit_variant("Long").to_string(), "Long");
    }
}
