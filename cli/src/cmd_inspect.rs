//! `idlcodec inspect` — summarise a loaded IDL.

use anyhow::{Context, Result};
use idlcodec_core::{layout, Matcher, RecordCategory, SchemaRegistry};
use idlcodec_registry::MemoryRegistry;

pub fn run(registry: &MemoryRegistry, kind: Option<&str>, as_json: bool) -> Result<()> {
    match kind {
        Some(kind) => show_kind(registry, kind, as_json),
        None => show_program(registry, as_json),
    }
}

fn show_program(registry: &MemoryRegistry, as_json: bool) -> Result<()> {
    let program = registry.program();
    if as_json {
        let kinds: Vec<_> = registry
            .schemas()
            .into_iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "category": s.category,
                    "discriminator": s.discriminator.to_hex(),
                    "fields": s.fields.len(),
                })
            })
            .collect();
        let out = serde_json::json!({
            "program": program,
            "kinds": kinds,
            "types": registry.type_names(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Program: {} v{}",
        program.name.as_deref().unwrap_or("<unnamed>"),
        program.version.as_deref().unwrap_or("?")
    );
    if let Some(address) = &program.address {
        println!("Address: {address}");
    }
    for category in [RecordCategory::Account, RecordCategory::Event] {
        println!("{}s:", capitalise(category.namespace()));
        for name in registry.kinds(category) {
            if let Some(schema) = registry.schema(name) {
                println!(
                    "  {:32} {}  {} fields",
                    schema.name,
                    schema.discriminator.to_hex(),
                    schema.fields.len()
                );
            }
        }
    }
    println!("Types: {}", registry.type_names().join(", "));
    Ok(())
}

fn show_kind(registry: &MemoryRegistry, kind: &str, as_json: bool) -> Result<()> {
    let schema = registry
        .lookup(kind)
        .with_context(|| format!("no record kind '{kind}'"))?;
    let memcmp = Matcher::new(registry).memcmp(kind)?;

    // (name, type, offset, size); offsets stop at the first variable field
    let rows: Vec<(String, String, Option<usize>, Option<usize>)> = schema
        .fields
        .iter()
        .map(|f| {
            (
                f.name.clone(),
                f.ty.to_string(),
                layout::field_offset(schema, &f.name, registry).ok(),
                layout::fixed_size(&f.ty, registry),
            )
        })
        .collect();

    if as_json {
        let fields: Vec<_> = rows
            .iter()
            .map(|(name, ty, offset, size)| {
                serde_json::json!({ "name": name, "type": ty, "offset": offset, "size": size })
            })
            .collect();
        let out = serde_json::json!({
            "name": schema.name,
            "category": schema.category,
            "discriminator": schema.discriminator.to_hex(),
            "memcmp": memcmp,
            "fields": fields,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("✓ {} ({})", schema.name, schema.category);
    println!("  Discriminator: {} at offset {}", schema.discriminator.to_hex(), schema.discriminator_offset);
    println!("  Memcmp bytes:  {}", memcmp.bytes_base58());
    println!("  Fields:        {}", schema.fields.len());
    for (name, ty, offset, size) in &rows {
        let at = offset.map_or_else(|| "-".to_string(), |o| o.to_string());
        let width = size.map_or_else(|| "var".to_string(), |s| s.to_string());
        println!("    {at:>5}  {width:>4}  {name}: {ty}");
    }
    Ok(())
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
