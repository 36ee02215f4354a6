//! `idlcodec open-positions` — decode a `getProgramAccounts` dump and keep
//! the positions that are open.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use idlcodec_batch::{BatchEngine, BatchRequest};
use idlcodec_borsh::BorshCodec;
use idlcodec_core::{
    decoder::ErrorMode, filter::owned_by, DecodedRecord, Matcher, OpenPosition, PredicateExt,
    Pubkey, RawRecord, RecordPredicate,
};
use idlcodec_events::{decode_payload, PayloadEncoding};
use serde::Deserialize;
use serde_json::Value as Json;

use crate::input::read_source;

/// One entry of a `getProgramAccounts` result.
#[derive(Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: AccountBody,
}

#[derive(Deserialize)]
struct AccountBody {
    data: AccountData,
}

/// `[text, encoding]` as RPC returns it, or bare base-58.
#[derive(Deserialize)]
#[serde(untagged)]
enum AccountData {
    Encoded(String, String),
    Plain(String),
}

impl AccountData {
    fn bytes(&self) -> Result<Vec<u8>> {
        let (text, encoding) = match self {
            AccountData::Encoded(text, enc) => match enc.as_str() {
                "base64" => (text, PayloadEncoding::Base64),
                "base58" => (text, PayloadEncoding::Base58),
                other => bail!("unsupported account encoding '{other}'"),
            },
            AccountData::Plain(text) => (text, PayloadEncoding::Base58),
        };
        Ok(decode_payload(text, encoding)?)
    }
}

fn parse_accounts(text: &str) -> Result<Vec<RawRecord>> {
    let value: Json = serde_json::from_str(text).context("parse accounts JSON")?;
    // Accept the bare array or the full JSON-RPC response
    let list = match value {
        Json::Object(mut map) if map.contains_key("result") => map.remove("result").unwrap_or_default(),
        other => other,
    };
    let entries: Vec<Json> =
        serde_json::from_value(list).context("expected an array of getProgramAccounts entries")?;
    let raws = entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| match parse_entry(entry) {
            Ok(raw) => Some(raw),
            Err(err) => {
                tracing::warn!(index = idx, error = %format!("{err:#}"), "skipping account entry");
                None
            }
        })
        .collect();
    Ok(raws)
}

fn parse_entry(entry: Json) -> Result<RawRecord> {
    let account: KeyedAccount =
        serde_json::from_value(entry).context("not a getProgramAccounts entry")?;
    let address = Pubkey::from_str(&account.pubkey)
        .with_context(|| format!("invalid account pubkey '{}'", account.pubkey))?;
    Ok(RawRecord::account(account.account.data.bytes()?).with_address(address))
}

pub fn run(
    codec: &BorshCodec,
    source: &str,
    kind: &str,
    owner: Option<&str>,
    as_json: bool,
) -> Result<()> {
    let raws = parse_accounts(&read_source(source)?)?;
    let total = raws.len();

    // Same selection an RPC node makes with the discriminator memcmp
    let matcher = Matcher::new(codec.registry());
    let selected: Vec<RawRecord> = raws
        .into_iter()
        .filter(|r| matcher.matches(&r.data, kind))
        .map(|r| r.with_kind(kind))
        .collect();
    let addresses: Vec<Option<Pubkey>> = selected.iter().map(|r| r.address).collect();

    let engine = BatchEngine::new(Arc::new(codec.clone()));
    let result = engine.decode(BatchRequest::new(selected).error_mode(ErrorMode::Collect))?;
    for (idx, err) in &result.errors {
        tracing::warn!(index = idx, error = %err, "account did not decode");
    }

    let predicate: Box<dyn RecordPredicate> = match owner {
        Some(key) => {
            let key = Pubkey::from_str(key).with_context(|| format!("invalid owner '{key}'"))?;
            Box::new(OpenPosition::default().and(owned_by(key)))
        }
        None => Box::new(OpenPosition::default()),
    };
    let open: Vec<(Option<Pubkey>, DecodedRecord)> = result
        .records
        .into_iter()
        .filter(|(_, r)| predicate.test(r))
        .map(|(i, r)| (addresses[i], r))
        .collect();

    if as_json {
        let out: Vec<_> = open
            .iter()
            .map(|(address, r)| serde_json::json!({ "address": address, "record": r }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (address, r) in &open {
        let field = |name: &str| r.field(name).map(|v| v.to_string()).unwrap_or_default();
        println!(
            "{}  owner={} side={} sizeUsd={} collateralUsd={} price={}",
            address.map(|a| a.to_string()).unwrap_or_default(),
            field("owner"),
            field("side"),
            field("sizeUsd"),
            field("collateralUsd"),
            field("price"),
        );
    }
    println!(
        "\n{} accounts, {} {kind}, {} open",
        total,
        addresses.len(),
        open.len()
    );
    Ok(())
}
