//! Loads the bundled Jupiter Perpetuals IDL and checks the registry built
//! from it: kinds, derived discriminators, type resolution and static
//! field offsets used for remote filtering.

use std::str::FromStr;

use idlcodec_core::{
    layout, Discriminator, IdlType, Matcher, Pubkey, RecordCategory, SchemaRegistry, TypeDef,
};
use idlcodec_registry::{perpetuals, MemoryRegistry, RegistryConfig};

fn idl_path() -> std::path::PathBuf {
    let mut p = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("../../fixtures/idl/perpetuals.json");
    p
}

#[test]
fn bundled_idl_matches_fixture_file() {
    let from_file = MemoryRegistry::load_idl_file(&idl_path(), &RegistryConfig::default()).unwrap();
    let bundled = perpetuals::registry().unwrap();
    assert_eq!(from_file.len(), bundled.len());
    assert_eq!(from_file.type_names(), bundled.type_names());
}

#[test]
fn declares_expected_kinds() {
    let reg = perpetuals::registry().unwrap();
    assert_eq!(
        reg.kinds(RecordCategory::Account),
        vec!["Position", "Custody", "Pool"]
    );
    assert_eq!(
        reg.kinds(RecordCategory::Event),
        vec![
            "ClosePositionRequestEvent",
            "IncreasePositionEvent",
            "DecreasePositionEvent"
        ]
    );
    assert_eq!(reg.program().name.as_deref(), Some("perpetuals"));
    assert_eq!(
        reg.program().address,
        Some(Pubkey::from_str(perpetuals::PROGRAM_ID).unwrap())
    );
}

#[test]
fn discriminators_are_anchor_derived() {
    let reg = perpetuals::registry().unwrap();
    let position = reg.lookup("position").unwrap();
    assert_eq!(
        position.discriminator,
        Discriminator::anchor(RecordCategory::Account, "Position", 8)
    );
    // Anchor's well-known Position discriminator
    assert_eq!(position.discriminator.to_hex(), "0xaabc8fe47a40f7d0");

    let mut data = position.discriminator.0.clone();
    data.extend_from_slice(&[0u8; 16]);
    let hit = reg.schema_by_discriminator(RecordCategory::Account, &data).unwrap();
    assert_eq!(hit.name, "Position");
    assert!(reg.schema_by_discriminator(RecordCategory::Event, &data).is_none());
}

#[test]
fn nested_types_resolve() {
    let reg = perpetuals::registry().unwrap();
    let custody = reg.lookup("custody").unwrap();
    let assets = custody.field("assets").unwrap();
    assert_eq!(assets.ty, IdlType::defined("Assets"));
    match reg.type_def("Assets").unwrap() {
        TypeDef::Struct { fields } => {
            let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(
                names,
                vec![
                    "feesReserves",
                    "owned",
                    "locked",
                    "guaranteedUsd",
                    "globalShortSizes",
                    "globalShortAveragePrices"
                ]
            );
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(reg.type_def("Side"), Some(TypeDef::Enum { .. })));
}

#[test]
fn position_owner_sits_after_discriminator() {
    let reg = perpetuals::registry().unwrap();
    let position = reg.lookup("Position").unwrap();
    assert_eq!(layout::field_offset(position, "owner", &reg).unwrap(), 8);
    assert_eq!(layout::field_offset(position, "pool", &reg).unwrap(), 40);

    let wallet = Pubkey::new([7; 32]);
    let filter = Matcher::new(&reg)
        .pubkey_filter("position", "owner", &wallet)
        .unwrap();
    assert_eq!(filter.offset, 8);
    assert_eq!(filter.bytes_base58(), wallet.to_base58());
}

#[test]
fn pool_fields_after_name_have_no_fixed_offset() {
    let reg = perpetuals::registry().unwrap();
    let pool = reg.lookup("pool").unwrap();
    assert_eq!(layout::field_offset(pool, "name", &reg).unwrap(), 8);
    assert!(layout::field_offset(pool, "aumUsd", &reg).is_err());
}

#[test]
fn wider_discriminators_are_configurable() {
    let cfg = RegistryConfig {
        discriminator_len: 16,
        account_discriminator_offset: 0,
    };
    let reg = MemoryRegistry::from_idl_json(perpetuals::IDL_JSON, &cfg).unwrap();
    assert_eq!(reg.lookup("position").unwrap().discriminator.len(), 16);
    let position = reg.lookup("position").unwrap();
    assert_eq!(layout::field_offset(position, "owner", &reg).unwrap(), 16);
}
