//! Golden compatibility tests.
//!
//! Each test serialises a Rust struct with `borsh`'s derive, prefixes the
//! Anchor discriminator, decodes it through the registry-driven codec using
//! the bundled Perpetuals IDL, and checks both directions agree byte for
//! byte.

use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};
use idlcodec_borsh::BorshCodec;
use idlcodec_core::{
    Discriminator, Pubkey, RecordCategory, RecordCodec, Value, DISCRIMINATOR_LEN,
};
use idlcodec_registry::perpetuals;

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn codec() -> BorshCodec {
    BorshCodec::new(Arc::new(perpetuals::registry().expect("bundled IDL loads")))
}

fn tagged(category: RecordCategory, name: &str, body: &impl BorshSerialize) -> Vec<u8> {
    let mut out = Discriminator::anchor(category, name, DISCRIMINATOR_LEN).0;
    out.extend(borsh::to_vec(body).unwrap());
    out
}

fn key(b: u8) -> [u8; 32] {
    [b; 32]
}

// ─── Mirrors of the IDL layouts ───────────────────────────────────────────────

#[derive(Debug, PartialEq, BorshSerialize, BorshDeserialize)]
enum Side {
    None,
    Long,
    Short,
}

#[derive(Debug, PartialEq, BorshSerialize, BorshDeserialize)]
struct Position {
    owner: [u8; 32],
    pool: [u8; 32],
    custody: [u8; 32],
    collateral_custody: [u8; 32],
    open_time: i64,
    update_time: i64,
    side: Side,
    price: u64,
    size_usd: u64,
    collateral_usd: u64,
    realised_pnl_usd: i64,
    cumulative_interest_snapshot: u128,
    locked_amount: u64,
    bump: u8,
}

#[derive(Debug, PartialEq, BorshSerialize, BorshDeserialize)]
struct Limit {
    max_aum_usd: u128,
    token_weightage_buffer_bps: u128,
    max_position_usd: u64,
}

#[derive(Debug, PartialEq, BorshSerialize, BorshDeserialize)]
struct Fees {
    swap_multiplier: u64,
    stable_swap_multiplier: u64,
    add_remove_liquidity_bps: u64,
    swap_bps: u64,
    tax_bps: u64,
    stable_swap_bps: u64,
    stable_swap_tax_bps: u64,
    liquidation_reward_bps: u64,
    protocol_share_bps: u64,
}

#[derive(Debug, PartialEq, BorshSerialize, BorshDeserialize)]
struct PoolApr {
    last_updated: i64,
    fee_apr_bps: u64,
    realized_fee_usd: u64,
}

#[derive(Debug, PartialEq, BorshSerialize, BorshDeserialize)]
struct Pool {
    name: String,
    custodies: Vec<[u8; 32]>,
    aum_usd: u128,
    limit: Limit,
    fees: Fees,
    pool_apr: PoolApr,
    max_request_execution_sec: i64,
    bump: u8,
    lp_token_bump: u8,
    inception_time: i64,
}

#[derive(Debug, PartialEq, BorshSerialize, BorshDeserialize)]
struct IncreasePositionEvent {
    position_key: [u8; 32],
    position_side: u8,
    position_custody: [u8; 32],
    position_collateral_custody: [u8; 32],
    position_size_usd: u64,
    position_mint: [u8; 32],
    position_request_key: [u8; 32],
    size_usd_delta: u64,
    collateral_usd_delta: u64,
    collateral_token_delta: u64,
    price: u64,
    price_slippage: Option<u64>,
    fee_token: u64,
    fee_usd: u64,
    open_time: i64,
    referral: Option<[u8; 32]>,
}

fn position() -> Position {
    Position {
        owner: key(1),
        pool: key(2),
        custody: key(3),
        collateral_custody: key(4),
        open_time: 1_700_000_000,
        update_time: 1_700_000_600,
        side: Side::Long,
        price: 64_250_000_000,
        size_usd: 1_500_000_000,
        collateral_usd: 150_000_000,
        realised_pnl_usd: -12_345,
        cumulative_interest_snapshot: 9_876_543_210_123_456_789,
        locked_amount: 23_000,
        bump: 254,
    }
}

fn pool() -> Pool {
    Pool {
        name: "Pool".into(),
        custodies: vec![key(10), key(11), key(12)],
        aum_usd: 1_234_567_890_123_456,
        limit: Limit {
            max_aum_usd: u128::MAX,
            token_weightage_buffer_bps: 2_000,
            max_position_usd: 2_500_000_000_000,
        },
        fees: Fees {
            swap_multiplier: 1,
            stable_swap_multiplier: 2,
            add_remove_liquidity_bps: 3,
            swap_bps: 4,
            tax_bps: 5,
            stable_swap_bps: 6,
            stable_swap_tax_bps: 7,
            liquidation_reward_bps: 8,
            protocol_share_bps: 2_500,
        },
        pool_apr: PoolApr {
            last_updated: 1_700_000_000,
            fee_apr_bps: 1_234,
            realized_fee_usd: 55_000_000,
        },
        max_request_execution_sec: 45,
        bump: 252,
        lp_token_bump: 251,
        inception_time: 1_689_000_000,
    }
}

// ─── Position ─────────────────────────────────────────────────────────────────

#[test]
fn position_golden() {
    let bytes = tagged(RecordCategory::Account, "Position", &position());
    let rec = codec().decode(&bytes, "position").unwrap();

    assert_eq!(rec.kind, "Position");
    assert_eq!(rec.field("owner"), Some(&Value::Pubkey(Pubkey::new(key(1)))));
    assert_eq!(rec.field("side"), Some(&Value::unit_variant("Long")));
    assert_eq!(rec.get_u64("sizeUsd").unwrap(), 1_500_000_000);
    assert_eq!(rec.get_i64("realisedPnlUsd").unwrap(), -12_345);
    assert_eq!(
        rec.field("cumulativeInterestSnapshot"),
        Some(&Value::Uint(9_876_543_210_123_456_789))
    );
    assert_eq!(rec.field("bump"), Some(&Value::Uint(254)));

    let names: Vec<_> = rec.fields.keys().map(String::as_str).collect();
    assert_eq!(names[..4], ["owner", "pool", "custody", "collateralCustody"]);
}

#[test]
fn position_encodes_like_derive() {
    let c = codec();
    let bytes = tagged(RecordCategory::Account, "Position", &position());
    let rec = c.decode(&bytes, "Position").unwrap();
    let encoded = c.encode(&rec).unwrap();
    assert_eq!(encoded, bytes);
    let back = Position::try_from_slice(&encoded[DISCRIMINATOR_LEN..]).unwrap();
    assert_eq!(back, position());
}

// ─── Pool ─────────────────────────────────────────────────────────────────────

#[test]
fn pool_golden() {
    let c = codec();
    let bytes = tagged(RecordCategory::Account, "Pool", &pool());
    let rec = c.decode_any(&bytes, RecordCategory::Account).unwrap();

    assert_eq!(rec.kind, "Pool");
    assert_eq!(rec.field("name"), Some(&Value::Str("Pool".into())));
    match rec.field("custodies") {
        Some(Value::Array(items)) => {
            assert_eq!(items.len(), 3);
            assert_eq!(items[2], Value::Pubkey(Pubkey::new(key(12))));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(rec.path("limit.maxAumUsd"), Some(&Value::Uint(u128::MAX)));
    assert_eq!(rec.get_u64("poolApr.feeAprBps").unwrap(), 1_234);
    assert_eq!(rec.get_u64("fees.protocolShareBps").unwrap(), 2_500);

    assert_eq!(c.encode(&rec).unwrap(), bytes);
}

// ─── Events ───────────────────────────────────────────────────────────────────

#[test]
fn increase_position_event_golden() {
    let c = codec();
    let ev = IncreasePositionEvent {
        position_key: key(20),
        position_side: 2,
        position_custody: key(21),
        position_collateral_custody: key(22),
        position_size_usd: 10_000_000,
        position_mint: key(23),
        position_request_key: key(24),
        size_usd_delta: 5_000_000,
        collateral_usd_delta: 500_000,
        collateral_token_delta: 4_000,
        price: 150_000_000,
        price_slippage: Some(151_000_000),
        fee_token: 12,
        fee_usd: 3_000,
        open_time: 1_700_000_123,
        referral: None,
    };
    let bytes = tagged(RecordCategory::Event, "IncreasePositionEvent", &ev);
    let rec = c.decode_any(&bytes, RecordCategory::Event).unwrap();

    assert_eq!(rec.kind, "IncreasePositionEvent");
    assert_eq!(rec.category, RecordCategory::Event);
    assert_eq!(rec.field("priceSlippage"), Some(&Value::Uint(151_000_000)));
    assert_eq!(rec.field("referral"), Some(&Value::Null));
    assert_eq!(rec.get_u64("sizeUsdDelta").unwrap(), 5_000_000);

    // the same bytes are not an account
    assert!(c.decode_any(&bytes, RecordCategory::Account).is_err());

    let encoded = c.encode(&rec).unwrap();
    assert_eq!(encoded, bytes);
    assert_eq!(
        IncreasePositionEvent::try_from_slice(&encoded[DISCRIMINATOR_LEN..]).unwrap(),
        ev
    );
}
