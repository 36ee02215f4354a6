//! `idlcodec decode` / `encode` / `memcmp`.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use idlcodec_borsh::BorshCodec;
use idlcodec_core::{
    DecodedRecord, Matcher, Pubkey, RecordCategory, RecordCodec, SchemaRegistry,
};
use idlcodec_registry::MemoryRegistry;

use crate::input::{decode_bytes, encode_bytes, read_source, DataEncoding};

pub fn decode(
    codec: &BorshCodec,
    data: &str,
    encoding: DataEncoding,
    kind: Option<&str>,
    category: RecordCategory,
    as_json: bool,
) -> Result<()> {
    let bytes = decode_bytes(data, encoding)?;
    let record = match kind {
        Some(kind) => codec.decode(&bytes, kind)?,
        None => codec.decode_any(&bytes, category)?,
    };
    print_record(&record, as_json)
}

pub fn encode(codec: &BorshCodec, source: &str, encoding: DataEncoding) -> Result<()> {
    let text = read_source(source)?;
    let record: DecodedRecord =
        serde_json::from_str(&text).context("parse record JSON")?;
    let bytes = codec.encode(&record)?;
    println!("{}", encode_bytes(&bytes, encoding));
    Ok(())
}

pub fn memcmp(
    registry: &MemoryRegistry,
    kind: &str,
    field: Option<&str>,
    pubkey: Option<&str>,
) -> Result<()> {
    let matcher = Matcher::new(registry);
    let schema = registry.lookup(kind)?;
    if schema.category != RecordCategory::Account {
        bail!("'{}' is an {}; memcmp filters apply to accounts", schema.name, schema.category);
    }

    let mut filters = vec![matcher.memcmp(kind)?];
    match (field, pubkey) {
        (Some(field), Some(key)) => {
            let key = Pubkey::from_str(key).with_context(|| format!("invalid pubkey '{key}'"))?;
            filters.push(matcher.pubkey_filter(kind, field, &key)?);
        }
        (None, None) => {}
        _ => bail!("--field and --pubkey go together"),
    }

    let wrapped: Vec<_> = filters
        .iter()
        .map(|f| serde_json::json!({ "memcmp": f }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&wrapped)?);
    Ok(())
}

pub fn print_record(record: &DecodedRecord, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        println!("Kind:    {} ({})", record.kind, record.category);
        println!("Fields:");
        for (name, value) in &record.fields {
            println!("  {name}: {value}");
        }
    }
    Ok(())
}
