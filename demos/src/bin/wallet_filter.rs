//! # wallet_filter
//!
//! Builds the RPC filters that select one wallet's Perpetuals positions,
//! then applies the same selection locally with composable predicates.
//!
//! Run with:
//! ```sh
//! cargo run --bin wallet_filter
//! ```

use anyhow::Result;
use idlcodec_borsh::BorshCodec;
use idlcodec_core::{
    filter::{owned_by, retain_matching, KindIs},
    DecodedRecord, Matcher, OpenPosition, PredicateExt, Pubkey, RecordCategory, RecordCodec,
    Value,
};
use idlcodec_registry::perpetuals;
use std::sync::Arc;

fn position(owner: Pubkey, size_usd: u64) -> DecodedRecord {
    DecodedRecord::new("Position", RecordCategory::Account)
        .with("owner", owner)
        .with("pool", Pubkey::new([0xA0; 32]))
        .with("custody", Pubkey::new([0xA1; 32]))
        .with("collateralCustody", Pubkey::new([0xA2; 32]))
        .with("openTime", 1_700_000_000i64)
        .with("updateTime", 1_700_000_000i64)
        .with("side", Value::unit_variant("Long"))
        .with("price", 1u64)
        .with("sizeUsd", size_usd)
        .with("collateralUsd", 1u64)
        .with("realisedPnlUsd", 0i64)
        .with("cumulativeInterestSnapshot", 0u128)
        .with("lockedAmount", 0u64)
        .with("bump", 255u8)
}

fn main() -> Result<()> {
    let registry = perpetuals::registry()?;
    let matcher = Matcher::new(&registry);
    let wallet = Pubkey::new([0x42; 32]);

    // ── 1. Remote filters ─────────────────────────────────────────────────────
    let filters = vec![
        matcher.memcmp("position")?,
        matcher.pubkey_filter("position", "owner", &wallet)?,
    ];
    let wrapped: Vec<_> = filters
        .iter()
        .map(|f| serde_json::json!({ "memcmp": f }))
        .collect();
    println!("─── getProgramAccounts filters ─────────────────────────");
    println!("{}", serde_json::to_string_pretty(&wrapped)?);

    // ── 2. The same selection, locally ────────────────────────────────────────
    let codec = BorshCodec::new(Arc::new(registry.clone()));
    let accounts = vec![
        codec.encode(&position(wallet, 5_000_000))?,
        codec.encode(&position(wallet, 0))?,
        codec.encode(&position(Pubkey::new([0x43; 32]), 7_000_000))?,
    ];
    let remote_hits = accounts
        .iter()
        .filter(|data| filters.iter().all(|f| f.matches(data)))
        .count();
    println!("\n  memcmp filters select {remote_hits} of {} accounts", accounts.len());

    let decoded = accounts
        .iter()
        .map(|data| codec.decode(data, "position"))
        .collect::<Result<Vec<_>, _>>()?;
    let wanted = KindIs("position".into())
        .and(owned_by(wallet))
        .and(OpenPosition::default());
    let open = retain_matching(decoded, &wanted);
    println!("  open positions for {wallet}: {}", open.len());
    for record in &open {
        println!("    sizeUsd={}", record.get_u64("sizeUsd")?);
    }
    Ok(())
}
