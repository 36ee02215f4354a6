//! # open_positions
//!
//! Decodes a batch of Perpetuals `Position` accounts with `BatchEngine`,
//! with progress reporting and error collection, then keeps the open ones
//! (`sizeUsd > 0`).
//!
//! The accounts are built locally with the encoder so the demo runs
//! offline; in production they are the `getProgramAccounts` result for the
//! discriminator memcmp filter.
//!
//! Run with:
//! ```sh
//! cargo run --bin open_positions
//! ```

use anyhow::Result;
use idlcodec_batch::{BatchEngine, BatchRequest};
use idlcodec_borsh::BorshCodec;
use idlcodec_core::{
    decoder::ErrorMode, DecodedRecord, Matcher, OpenPosition, Pubkey, RawRecord, RecordCategory,
    RecordCodec, Value,
};
use idlcodec_registry::perpetuals;
use std::sync::Arc;

fn position(owner: u8, side: &str, size_usd: u64, collateral_usd: u64) -> DecodedRecord {
    DecodedRecord::new("Position", RecordCategory::Account)
        .with("owner", Pubkey::new([owner; 32]))
        .with("pool", Pubkey::new([0xA0; 32]))
        .with("custody", Pubkey::new([0xA1; 32]))
        .with("collateralCustody", Pubkey::new([0xA2; 32]))
        .with("openTime", 1_700_000_000i64)
        .with("updateTime", 1_700_000_600i64)
        .with("side", Value::unit_variant(side))
        .with("price", 150_250_000u64)
        .with("sizeUsd", size_usd)
        .with("collateralUsd", collateral_usd)
        .with("realisedPnlUsd", 0i64)
        .with("cumulativeInterestSnapshot", 0u128)
        .with("lockedAmount", size_usd / 150)
        .with("bump", 254u8)
}

fn main() -> Result<()> {
    // ── 1. Load the registry ──────────────────────────────────────────────────
    let registry = perpetuals::registry()?;
    println!("✓ Registry loaded ({} kinds)", registry.len());
    let codec = BorshCodec::new(Arc::new(registry.clone()));

    let filter = Matcher::new(&registry).memcmp("position")?;
    println!(
        "  getProgramAccounts filter: memcmp offset={} bytes={}",
        filter.offset,
        filter.bytes_base58()
    );

    // ── 2. Build a batch of raw accounts ──────────────────────────────────────
    // 4 positions (2 open, 2 closed) + 1 truncated account
    let mut accounts = vec![
        codec.encode(&position(1, "Long", 25_000_000_000, 2_500_000_000))?,
        codec.encode(&position(2, "Short", 0, 0))?,
        codec.encode(&position(3, "Short", 9_000_000_000, 1_000_000_000))?,
        codec.encode(&position(4, "Long", 0, 0))?,
    ];
    let mut truncated = codec.encode(&position(5, "Long", 1, 1))?;
    truncated.truncate(100);
    accounts.push(truncated);

    let raws: Vec<RawRecord> = accounts
        .into_iter()
        .map(|data| RawRecord::account(data).with_kind("Position"))
        .collect();
    println!("✓ Prepared {} raw accounts (4 valid + 1 truncated)", raws.len());

    // ── 3. Run the BatchEngine in Collect mode ────────────────────────────────
    let engine = BatchEngine::new(Arc::new(codec));
    let request = BatchRequest::new(raws)
        .chunk_size(2)
        .error_mode(ErrorMode::Collect)
        .on_progress(|done, total| {
            print!("\r  Progress: {done}/{total}");
            let _ = std::io::Write::flush(&mut std::io::stdout());
        });

    let mut result = engine.decode(request)?;
    println!();

    println!("\n─── Batch Result ────────────────────────────────────────");
    println!("  total input:  {}", result.total_input);
    println!("  decoded:      {}", result.records.len());
    println!("  errors:       {}", result.errors.len());
    for (idx, err) in &result.errors {
        println!("  [input #{idx}] {err}");
    }

    // ── 4. Keep the open positions ────────────────────────────────────────────
    result.retain(&OpenPosition::default());
    println!("\n─── Open Positions ──────────────────────────────────────");
    for (idx, record) in &result.records {
        println!(
            "  [{idx}] owner={} side={} sizeUsd={} collateralUsd={}",
            record.field("owner").map(|v| v.to_string()).unwrap_or_default(),
            record.field("side").map(|v| v.to_string()).unwrap_or_default(),
            record.get_u64("sizeUsd")?,
            record.get_u64("collateralUsd")?,
        );
    }

    println!("\n✓ {} open positions", result.records.len());
    Ok(())
}
