//! In-memory `SchemaRegistry` implementation.
//!
//! The registry is assembled once by `RegistryBuilder`, validated as a whole,
//! and then frozen. Clones share the same `Arc`, so it can be handed to every
//! decoder thread without locking.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use idlcodec_core::{
    error::RegistryError,
    types::INT_WIDTHS,
    IdlType, RecordCategory, Schema, SchemaRegistry, TypeDef, VariantFields,
};
use indexmap::IndexMap;

use crate::config::RegistryConfig;
use crate::idl::{IdlParser, ParsedIdl, ProgramInfo};

/// Normalised lookup key: first letter lower-cased, rest verbatim.
fn kind_key(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Discriminators of one category that share an offset and width.
struct DiscriminatorIndex {
    category: RecordCategory,
    offset: usize,
    width: usize,
    by_bytes: HashMap<Vec<u8>, usize>,
}

struct Inner {
    program: ProgramInfo,
    schemas: Vec<Schema>,
    by_kind: HashMap<String, usize>,
    discriminators: Vec<DiscriminatorIndex>,
    types: IndexMap<String, TypeDef>,
}

/// Immutable, thread-safe schema registry.
#[derive(Clone)]
pub struct MemoryRegistry {
    inner: Arc<Inner>,
}

impl MemoryRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build a registry from Anchor IDL JSON.
    pub fn from_idl_json(json: &str, config: &RegistryConfig) -> Result<Self, RegistryError> {
        Self::from_parsed(IdlParser::parse(json, config)?)
    }

    /// Build a registry from an IDL file on disk.
    pub fn load_idl_file(path: &Path, config: &RegistryConfig) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        let registry = Self::from_idl_json(&content, config)?;
        tracing::debug!(
            path = %path.display(),
            kinds = registry.len(),
            "loaded IDL"
        );
        Ok(registry)
    }

    pub fn from_parsed(parsed: ParsedIdl) -> Result<Self, RegistryError> {
        let mut builder = Self::builder().program(parsed.program);
        for (name, def) in parsed.types {
            builder = builder.type_def(name, def);
        }
        for schema in parsed.schemas {
            builder = builder.schema(schema);
        }
        builder.build()
    }

    pub fn program(&self) -> &ProgramInfo {
        &self.inner.program
    }

    /// Number of record kinds.
    pub fn len(&self) -> usize {
        self.inner.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.schemas.is_empty()
    }

    /// Record kinds of one category, in declaration order.
    pub fn kinds(&self, category: RecordCategory) -> Vec<&str> {
        self.inner
            .schemas
            .iter()
            .filter(|s| s.category == category)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Names of all user-defined types, in declaration order.
    pub fn type_names(&self) -> Vec<&str> {
        self.inner.types.keys().map(String::as_str).collect()
    }
}

impl SchemaRegistry for MemoryRegistry {
    fn schema(&self, kind: &str) -> Option<&Schema> {
        let idx = *self.inner.by_kind.get(&kind_key(kind))?;
        self.inner.schemas.get(idx)
    }

    fn schema_by_discriminator(&self, category: RecordCategory, data: &[u8]) -> Option<&Schema> {
        self.inner
            .discriminators
            .iter()
            .filter(|d| d.category == category)
            .find_map(|d| {
                let end = d.offset.checked_add(d.width)?;
                let idx = d.by_bytes.get(data.get(d.offset..end)?)?;
                self.inner.schemas.get(*idx)
            })
    }

    fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.inner.types.get(name)
    }

    fn schemas(&self) -> Vec<&Schema> {
        self.inner.schemas.iter().collect()
    }
}

impl std::fmt::Debug for MemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRegistry")
            .field("program", &self.inner.program.name)
            .field("kinds", &self.inner.schemas.len())
            .field("types", &self.inner.types.len())
            .finish()
    }
}

// ─── Builder ──────────────────────────────────────────────────────────────────

/// Collects schemas and types, then validates them together.
#[derive(Default)]
pub struct RegistryBuilder {
    program: ProgramInfo,
    schemas: Vec<Schema>,
    types: Vec<(String, TypeDef)>,
}

impl RegistryBuilder {
    pub fn program(mut self, program: ProgramInfo) -> Self {
        self.program = program;
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn type_def(mut self, name: impl Into<String>, def: TypeDef) -> Self {
        self.types.push((name.into(), def));
        self
    }

    /// Validate and freeze.
    pub fn build(self) -> Result<MemoryRegistry, RegistryError> {
        let mut types = IndexMap::with_capacity(self.types.len());
        for (name, def) in self.types {
            if types.insert(name.clone(), def).is_some() {
                return Err(RegistryError::ValidationFailed {
                    reason: format!("type '{name}' defined more than once"),
                });
            }
        }

        // Accounts first, each category in declaration order.
        let mut schemas = self.schemas;
        schemas.sort_by_key(|s| s.category);

        let mut by_kind = HashMap::with_capacity(schemas.len());
        for (idx, schema) in schemas.iter().enumerate() {
            if by_kind.insert(kind_key(&schema.name), idx).is_some() {
                return Err(RegistryError::DuplicateKind {
                    name: schema.name.clone(),
                });
            }
        }

        let discriminators = index_discriminators(&schemas)?;

        for schema in &schemas {
            for field in &schema.fields {
                check_type(&field.ty, &types, &format!("{}.{}", schema.name, field.name))?;
            }
        }
        for (name, def) in &types {
            match def {
                TypeDef::Struct { fields } => {
                    for field in fields {
                        check_type(&field.ty, &types, &format!("{name}.{}", field.name))?;
                    }
                }
                TypeDef::Enum { variants } => {
                    if variants.len() > usize::from(u8::MAX) + 1 {
                        return Err(RegistryError::ValidationFailed {
                            reason: format!("enum '{name}' has more than 256 variants"),
                        });
                    }
                    for v in variants {
                        let ctx = format!("{name}::{}", v.name);
                        match &v.fields {
                            VariantFields::Unit => {}
                            VariantFields::Named(fields) => {
                                for field in fields {
                                    check_type(&field.ty, &types, &format!("{ctx}.{}", field.name))?;
                                }
                            }
                            VariantFields::Tuple(tys) => {
                                for (i, ty) in tys.iter().enumerate() {
                                    check_type(ty, &types, &format!("{ctx}.{i}"))?;
                                }
                            }
                        }
                    }
                }
            }
        }

        check_cycles(&types)?;

        tracing::debug!(
            kinds = schemas.len(),
            types = types.len(),
            "schema registry built"
        );

        Ok(MemoryRegistry {
            inner: Arc::new(Inner {
                program: self.program,
                schemas,
                by_kind,
                discriminators,
                types,
            }),
        })
    }
}

fn index_discriminators(schemas: &[Schema]) -> Result<Vec<DiscriminatorIndex>, RegistryError> {
    let mut out: Vec<DiscriminatorIndex> = Vec::new();
    for (idx, schema) in schemas.iter().enumerate() {
        if schema.discriminator.is_empty() {
            return Err(RegistryError::ValidationFailed {
                reason: format!("'{}' has an empty discriminator", schema.name),
            });
        }
        let width = schema.discriminator.len();
        let pos = out.iter().position(|d| {
            d.category == schema.category && d.offset == schema.discriminator_offset && d.width == width
        });
        let group = match pos {
            Some(p) => &mut out[p],
            None => {
                out.push(DiscriminatorIndex {
                    category: schema.category,
                    offset: schema.discriminator_offset,
                    width,
                    by_bytes: HashMap::new(),
                });
                let last = out.len() - 1;
                &mut out[last]
            }
        };
        if let Some(&first) = group.by_bytes.get(schema.discriminator.as_bytes()) {
            return Err(RegistryError::DuplicateDiscriminator {
                category: schema.category.to_string(),
                discriminator: schema.discriminator.to_hex(),
                first: schemas[first].name.clone(),
                second: schema.name.clone(),
            });
        }
        group.by_bytes.insert(schema.discriminator.0.clone(), idx);
    }
    Ok(out)
}

fn check_type(
    ty: &IdlType,
    types: &IndexMap<String, TypeDef>,
    context: &str,
) -> Result<(), RegistryError> {
    match ty {
        IdlType::Uint(bits) | IdlType::Int(bits) if !INT_WIDTHS.contains(bits) => {
            Err(RegistryError::UnknownType {
                ty: ty.to_string(),
                context: context.to_string(),
            })
        }
        IdlType::Array { elem, .. } | IdlType::Vec(elem) | IdlType::Option(elem) => {
            check_type(elem, types, context)
        }
        IdlType::Defined(name) if !types.contains_key(name) => Err(RegistryError::UnresolvedType {
            name: name.clone(),
            context: context.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Named types reachable from `ty` without passing a length prefix or an
/// option tag. A cycle through these edges would have infinite size.
fn direct_refs<'a>(ty: &'a IdlType, out: &mut Vec<&'a str>) {
    match ty {
        IdlType::Defined(name) => out.push(name),
        IdlType::Array { elem, .. } => direct_refs(elem, out),
        _ => {}
    }
}

fn type_edges(def: &TypeDef) -> Vec<&str> {
    let mut out = Vec::new();
    match def {
        TypeDef::Struct { fields } => fields.iter().for_each(|f| direct_refs(&f.ty, &mut out)),
        TypeDef::Enum { variants } => {
            for v in variants {
                match &v.fields {
                    VariantFields::Unit => {}
                    VariantFields::Named(fields) => {
                        fields.iter().for_each(|f| direct_refs(&f.ty, &mut out))
                    }
                    VariantFields::Tuple(tys) => tys.iter().for_each(|t| direct_refs(t, &mut out)),
                }
            }
        }
    }
    out
}

fn check_cycles(types: &IndexMap<String, TypeDef>) -> Result<(), RegistryError> {
    let mut done: HashSet<&str> = HashSet::new();
    for start in types.keys() {
        let mut on_path: Vec<&str> = Vec::new();
        visit(start, types, &mut on_path, &mut done)?;
    }
    Ok(())
}

fn visit<'a>(
    name: &'a str,
    types: &'a IndexMap<String, TypeDef>,
    on_path: &mut Vec<&'a str>,
    done: &mut HashSet<&'a str>,
) -> Result<(), RegistryError> {
    if done.contains(name) {
        return Ok(());
    }
    if on_path.contains(&name) {
        return Err(RegistryError::RecursiveType {
            name: name.to_string(),
        });
    }
    let Some(def) = types.get(name) else {
        return Ok(());
    };
    on_path.push(name);
    for next in type_edges(def) {
        visit(next, types, on_path, done)?;
    }
    on_path.pop();
    done.insert(name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use idlcodec_core::{Discriminator, FieldDef};

    fn account(name: &str, disc: u8, fields: Vec<FieldDef>) -> Schema {
        Schema {
            name: name.into(),
            category: RecordCategory::Account,
            discriminator: Discriminator::new(vec![disc; 8]),
            discriminator_offset: 0,
            fields,
        }
    }

    #[test]
    fn lookup_folds_first_letter() {
        let reg = MemoryRegistry::builder()
            .schema(account("Position", 1, vec![]))
            .build()
            .unwrap();
        assert_eq!(reg.schema("position").unwrap().name, "Position");
        assert_eq!(reg.schema("Position").unwrap().name, "Position");
        assert!(reg.schema("POSITION").is_none());
        assert!(reg.lookup("pool").is_err());
    }

    #[test]
    fn discriminator_lookup_respects_category() {
        let mut ev = account("Fired", 2, vec![]);
        ev.category = RecordCategory::Event;
        let reg = MemoryRegistry::builder()
            .schema(ev)
            .schema(account("Position", 1, vec![]))
            .build()
            .unwrap();
        let data = [2u8; 12];
        assert_eq!(
            reg.schema_by_discriminator(RecordCategory::Event, &data).unwrap().name,
            "Fired"
        );
        assert!(reg.schema_by_discriminator(RecordCategory::Account, &data).is_none());
        assert!(reg.schema_by_discriminator(RecordCategory::Event, &[2u8; 7]).is_none());
        // accounts are listed first
        assert_eq!(reg.schemas()[0].name, "Position");
    }

    #[test]
    fn rejects_duplicate_discriminators() {
        let err = MemoryRegistry::builder()
            .schema(account("A", 1, vec![]))
            .schema(account("B", 1, vec![]))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDiscriminator { .. }));
    }

    #[test]
    fn same_bytes_in_different_categories_is_fine() {
        let mut ev = account("B", 1, vec![]);
        ev.category = RecordCategory::Event;
        assert!(MemoryRegistry::builder()
            .schema(account("A", 1, vec![]))
            .schema(ev)
            .build()
            .is_ok());
    }

    #[test]
    fn rejects_duplicate_kind_names() {
        let err = MemoryRegistry::builder()
            .schema(account("Pool", 1, vec![]))
            .schema(account("pool", 2, vec![]))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKind { .. }));
    }

    #[test]
    fn rejects_unresolved_and_bad_widths() {
        let err = MemoryRegistry::builder()
            .schema(account("A", 1, vec![FieldDef::new("s", IdlType::defined("Side"))]))
            .build()
            .unwrap_err();
        match err {
            RegistryError::UnresolvedType { name, context } => {
                assert_eq!(name, "Side");
                assert_eq!(context, "A.s");
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = MemoryRegistry::builder()
            .schema(account("A", 1, vec![FieldDef::new("x", IdlType::Uint(24))]))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownType { .. }));
    }

    #[test]
    fn rejects_empty_discriminator() {
        let mut a = account("A", 1, vec![]);
        a.discriminator = Discriminator::new(Vec::new());
        let err = MemoryRegistry::builder().schema(a).build().unwrap_err();
        assert!(matches!(err, RegistryError::ValidationFailed { .. }));
    }

    #[test]
    fn direct_recursion_is_rejected_but_vec_breaks_it() {
        let node = |ty: IdlType| TypeDef::Struct {
            fields: vec![FieldDef::new("next", ty)],
        };
        let err = MemoryRegistry::builder()
            .type_def("Node", node(IdlType::defined("Node")))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::RecursiveType { .. }));

        let err = MemoryRegistry::builder()
            .type_def("Node", node(IdlType::array(IdlType::defined("Node"), 2)))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::RecursiveType { .. }));

        assert!(MemoryRegistry::builder()
            .type_def("Node", node(IdlType::vec(IdlType::defined("Node"))))
            .build()
            .is_ok());
        assert!(MemoryRegistry::builder()
            .type_def("Node", node(IdlType::option(IdlType::defined("Node"))))
            .build()
            .is_ok());
    }

    #[test]
    fn clones_share_state() {
        let reg = MemoryRegistry::builder()
            .schema(account("A", 1, vec![]))
            .build()
            .unwrap();
        let other = reg.clone();
        assert!(Arc::ptr_eq(&reg.inner, &other.inner));
    }
}
