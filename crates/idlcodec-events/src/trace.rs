//! Transaction traces: the ordered inner instructions of one transaction.
//!
//! `TransactionTrace::from_rpc_json` accepts the result of a
//! `getTransaction` call made with `"encoding": "json"` or `"jsonParsed"`
//! and `maxSupportedTransactionVersion: 0`.

use std::str::FromStr;

use base64::Engine as _;
use idlcodec_core::{CodecError, Pubkey};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Text encodings used for instruction data on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// RPC `json` encoding of instruction data
    #[default]
    Base58,
    Base64,
}

/// Decode instruction data text.
pub fn decode_payload(text: &str, encoding: PayloadEncoding) -> Result<Vec<u8>, CodecError> {
    match encoding {
        PayloadEncoding::Base58 => bs58::decode(text).into_vec().map_err(|e| {
            CodecError::InvalidPayload {
                reason: format!("base58: {e}"),
            }
        }),
        PayloadEncoding::Base64 => base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(|e| CodecError::InvalidPayload {
                reason: format!("base64: {e}"),
            }),
    }
}

/// One logged inner instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedInstruction {
    /// Index within the group as the RPC reported it. Instructions that
    /// could not be kept leave gaps.
    pub position: usize,
    pub program_id: Pubkey,
    #[serde(with = "hex_text")]
    pub data: Vec<u8>,
}

/// Inner instructions spawned by one outer instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerInstructionGroup {
    /// Index of the outer instruction
    pub index: u32,
    pub instructions: Vec<LoggedInstruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTrace {
    pub signature: String,
    pub slot: u64,
    /// False when the transaction's `meta.err` was set
    pub succeeded: bool,
    pub groups: Vec<InnerInstructionGroup>,
}

// ─── RPC JSON shapes ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    slot: u64,
    #[serde(default)]
    meta: Option<RpcMeta>,
    transaction: Json,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcMeta {
    #[serde(default)]
    err: Option<Json>,
    #[serde(default)]
    inner_instructions: Option<Vec<RpcInnerGroup>>,
    #[serde(default)]
    loaded_addresses: Option<RpcLoadedAddresses>,
}

#[derive(Deserialize)]
struct RpcLoadedAddresses {
    #[serde(default)]
    writable: Vec<String>,
    #[serde(default)]
    readonly: Vec<String>,
}

#[derive(Deserialize)]
struct RpcInnerGroup {
    index: u32,
    instructions: Vec<RpcInstruction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcInstruction {
    #[serde(default)]
    program_id_index: Option<usize>,
    /// `jsonParsed` names the program directly
    #[serde(default)]
    program_id: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Deserialize)]
struct RpcEnvelope {
    signatures: Vec<String>,
    message: RpcMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcMessage {
    account_keys: Vec<RpcAccountKey>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RpcAccountKey {
    Plain(String),
    Parsed { pubkey: String },
}

impl RpcAccountKey {
    fn as_str(&self) -> &str {
        match self {
            RpcAccountKey::Plain(s) => s,
            RpcAccountKey::Parsed { pubkey } => pubkey,
        }
    }
}

fn invalid(reason: impl Into<String>) -> CodecError {
    CodecError::InvalidPayload {
        reason: reason.into(),
    }
}

fn parse_key(text: &str) -> Result<Pubkey, CodecError> {
    Pubkey::from_str(text).map_err(|e| invalid(e.to_string()))
}

/// `Ok(None)` for instructions without raw data.
fn resolve_instruction(
    ix: RpcInstruction,
    position: usize,
    keys: &[Option<Pubkey>],
) -> Result<Option<LoggedInstruction>, CodecError> {
    let program_id = match (&ix.program_id, ix.program_id_index) {
        (Some(id), _) => parse_key(id)?,
        (None, Some(idx)) => match keys.get(idx) {
            Some(Some(key)) => *key,
            Some(None) => return Err(invalid(format!("account key {idx} is not a public key"))),
            None => {
                return Err(invalid(format!(
                    "programIdIndex {idx} out of {} keys",
                    keys.len()
                )))
            }
        },
        (None, None) => return Err(invalid("instruction names no program")),
    };
    let Some(text) = ix.data else {
        return Ok(None);
    };
    Ok(Some(LoggedInstruction {
        position,
        program_id,
        data: decode_payload(&text, PayloadEncoding::Base58)?,
    }))
}

impl TransactionTrace {
    /// Build a trace from a `getTransaction` result.
    pub fn from_rpc_json(value: &Json) -> Result<Self, CodecError> {
        let tx = RpcTransaction::deserialize(value)
            .map_err(|e| invalid(format!("transaction JSON: {e}")))?;
        let envelope = RpcEnvelope::deserialize(&tx.transaction).map_err(|_| {
            invalid("transaction must use the json or jsonParsed encoding")
        })?;
        let signature = envelope
            .signatures
            .first()
            .cloned()
            .ok_or_else(|| invalid("transaction has no signature"))?;

        let Some(meta) = tx.meta else {
            return Ok(Self {
                signature,
                slot: tx.slot,
                succeeded: false,
                groups: Vec::new(),
            });
        };

        // Static keys first, then address-table lookups: writable, readonly.
        // A key that does not parse only matters to instructions naming it.
        let loaded = meta
            .loaded_addresses
            .iter()
            .flat_map(|l| l.writable.iter().chain(&l.readonly))
            .map(String::as_str);
        let keys: Vec<Option<Pubkey>> = envelope
            .message
            .account_keys
            .iter()
            .map(RpcAccountKey::as_str)
            .chain(loaded)
            .map(|text| Pubkey::from_str(text).ok())
            .collect();

        let mut groups = Vec::new();
        for group in meta.inner_instructions.unwrap_or_default() {
            let mut instructions = Vec::with_capacity(group.instructions.len());
            for (position, ix) in group.instructions.into_iter().enumerate() {
                match resolve_instruction(ix, position, &keys) {
                    Ok(Some(logged)) => instructions.push(logged),
                    // Parsed instructions of well-known programs carry no raw data.
                    Ok(None) => {}
                    Err(err) => tracing::warn!(
                        signature = %signature,
                        group = group.index,
                        position,
                        error = %err,
                        "skipping unreadable inner instruction"
                    ),
                }
            }
            groups.push(InnerInstructionGroup {
                index: group.index,
                instructions,
            });
        }

        Ok(Self {
            signature,
            slot: tx.slot,
            succeeded: meta.err.is_none(),
            groups,
        })
    }

    /// Parse a JSON document holding one `getTransaction` result or an
    /// array of them. `null` entries (unknown signatures) are dropped, and
    /// so are array entries that do not parse, with a warning.
    pub fn from_rpc_str(text: &str) -> Result<Vec<Self>, CodecError> {
        let value: Json =
            serde_json::from_str(text).map_err(|e| invalid(format!("JSON: {e}")))?;
        match value {
            Json::Array(items) => Ok(Self::from_rpc_each(&items)
                .into_iter()
                .enumerate()
                .filter_map(|(item, parsed)| match parsed {
                    Ok(trace) => Some(trace),
                    Err(err) => {
                        tracing::warn!(item, error = %err, "skipping unreadable transaction");
                        None
                    }
                })
                .collect()),
            single => Ok(vec![Self::from_rpc_json(&single)?]),
        }
    }

    /// One result per non-null entry, in order.
    pub fn from_rpc_each(items: &[Json]) -> Vec<Result<Self, CodecError>> {
        items
            .iter()
            .filter(|v| !v.is_null())
            .map(Self::from_rpc_json)
            .collect()
    }

    /// Total number of inner instructions.
    pub fn instruction_count(&self) -> usize {
        self.groups.iter().map(|g| g.instructions.len()).sum()
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const AUTHORITY: &str = "37hJBDnntwqhGbK7L6M1bLyvccj4u55CCUiLPdYkiqBN";
    const SYSTEM: &str = "11111111111111111111111111111111";

    #[test]
    fn payload_encodings() {
        assert_eq!(decode_payload("Ldp", PayloadEncoding::Base58).unwrap(), vec![1, 2, 3]);
        assert_eq!(decode_payload("AQID", PayloadEncoding::Base64).unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            decode_payload("0OIl", PayloadEncoding::Base58),
            Err(CodecError::InvalidPayload { .. })
        ));
        assert!(decode_payload("*", PayloadEncoding::Base64).is_err());
    }

    #[test]
    fn resolves_program_ids_across_lookup_tables() {
        let value = json!({
            "slot": 7,
            "meta": {
                "err": null,
                "innerInstructions": [{
                    "index": 2,
                    "instructions": [
                        {"programIdIndex": 0, "data": "Ldp"},
                        {"programIdIndex": 1, "data": ""}
                    ]
                }],
                "loadedAddresses": {"writable": [], "readonly": [AUTHORITY]}
            },
            "transaction": {
                "signatures": ["sig"],
                "message": {"accountKeys": [SYSTEM]}
            }
        });
        let trace = TransactionTrace::from_rpc_json(&value).unwrap();
        assert_eq!(trace.signature, "sig");
        assert!(trace.succeeded);
        assert_eq!(trace.groups[0].index, 2);
        let ixs = &trace.groups[0].instructions;
        assert_eq!(ixs[0].program_id, Pubkey::new([0; 32]));
        assert_eq!(ixs[0].data, vec![1, 2, 3]);
        assert_eq!(ixs[1].program_id.to_base58(), AUTHORITY);
        assert_eq!(ixs[1].position, 1);
        assert!(ixs[1].data.is_empty());
    }

    #[test]
    fn failed_and_meta_less_transactions() {
        let value = json!({
            "slot": 1,
            "meta": {"err": {"InstructionError": [0, "Custom"]}},
            "transaction": {"signatures": ["s"], "message": {"accountKeys": []}}
        });
        let trace = TransactionTrace::from_rpc_json(&value).unwrap();
        assert!(!trace.succeeded);
        assert!(trace.groups.is_empty());

        let value = json!({
            "slot": 1,
            "transaction": {"signatures": ["s"], "message": {"accountKeys": []}}
        });
        assert!(!TransactionTrace::from_rpc_json(&value).unwrap().succeeded);
    }

    #[test]
    fn rejects_binary_encoded_transactions() {
        let value = json!({
            "slot": 1,
            "meta": {"err": null},
            "transaction": ["AQID", "base64"]
        });
        assert!(matches!(
            TransactionTrace::from_rpc_json(&value),
            Err(CodecError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn unreadable_instructions_leave_gaps() {
        let value = json!({
            "slot": 1,
            "meta": {"err": null, "innerInstructions": [
                {"index": 0, "instructions": [
                    {"programIdIndex": 9, "data": ""},
                    {"programIdIndex": 0, "data": "0OIl"},
                    {"programIdIndex": 1, "data": "Ldp"},
                    {"data": "Ldp"}
                ]}
            ]},
            "transaction": {"signatures": ["s"], "message": {"accountKeys": [SYSTEM, AUTHORITY]}}
        });
        let trace = TransactionTrace::from_rpc_json(&value).unwrap();
        let ixs = &trace.groups[0].instructions;
        assert_eq!(ixs.len(), 1);
        assert_eq!(ixs[0].position, 2);
        assert_eq!(ixs[0].program_id.to_base58(), AUTHORITY);
    }

    #[test]
    fn parsed_instructions_keep_later_positions() {
        let value = json!({
            "slot": 3,
            "meta": {"err": null, "innerInstructions": [
                {"index": 1, "instructions": [
                    {
                        "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
                        "program": "spl-token",
                        "parsed": {"type": "transfer", "info": {"amount": "10"}}
                    },
                    {"programId": AUTHORITY, "accounts": [], "data": "Ldp"}
                ]}
            ]},
            "transaction": {
                "signatures": ["p"],
                "message": {"accountKeys": [
                    {"pubkey": SYSTEM, "signer": true, "writable": true}
                ]}
            }
        });
        let trace = TransactionTrace::from_rpc_json(&value).unwrap();
        let ixs = &trace.groups[0].instructions;
        assert_eq!(ixs.len(), 1);
        assert_eq!(ixs[0].position, 1);
        assert_eq!(ixs[0].data, vec![1, 2, 3]);
    }

    #[test]
    fn one_bad_transaction_does_not_sink_the_batch() {
        let good = json!({
            "slot": 1,
            "meta": {"err": null, "innerInstructions": []},
            "transaction": {"signatures": ["good"], "message": {"accountKeys": []}}
        });
        let bad = json!({"slot": 2, "meta": null, "transaction": ["AQID", "base64"]});
        let text = serde_json::to_string(&json!([bad, null, good])).unwrap();

        let traces = TransactionTrace::from_rpc_str(&text).unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].signature, "good");

        let each = TransactionTrace::from_rpc_each(&[bad, Json::Null, good]);
        assert_eq!(each.len(), 2);
        assert!(each[0].is_err());
        assert!(each[1].is_ok());
    }
}
