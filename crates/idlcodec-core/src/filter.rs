//! Predicates over decoded records.
//!
//! Filters look at structure only and never at raw bytes. A predicate that
//! meets a record of the wrong shape answers `false` rather than failing.

use crate::pubkey::Pubkey;
use crate::record::DecodedRecord;
use crate::types::Value;

/// Field that carries a position's notional size.
pub const POSITION_SIZE_FIELD: &str = "sizeUsd";

/// A pure yes/no test over a decoded record.
pub trait RecordPredicate: Send + Sync {
    fn test(&self, record: &DecodedRecord) -> bool;
}

/// Blanket impl so closures can be used as predicates.
impl<F: Fn(&DecodedRecord) -> bool + Send + Sync> RecordPredicate for F {
    fn test(&self, record: &DecodedRecord) -> bool {
        self(record)
    }
}

/// Positions are never closed on-chain; a closed one keeps its account with
/// a zero size. Open means the size field is strictly positive.
#[derive(Debug, Clone)]
pub struct OpenPosition {
    pub size_field: String,
}

impl OpenPosition {
    pub fn with_size_field(field: impl Into<String>) -> Self {
        Self {
            size_field: field.into(),
        }
    }
}

impl Default for OpenPosition {
    fn default() -> Self {
        Self::with_size_field(POSITION_SIZE_FIELD)
    }
}

impl RecordPredicate for OpenPosition {
    fn test(&self, record: &DecodedRecord) -> bool {
        match record.path(&self.size_field) {
            Some(Value::Uint(v)) => *v > 0,
            Some(Value::Int(v)) => *v > 0,
            _ => false,
        }
    }
}

/// `sizeUsd > 0`.
pub fn is_open_position(record: &DecodedRecord) -> bool {
    OpenPosition::default().test(record)
}

/// Field (dotted path) equals a given value.
#[derive(Debug, Clone)]
pub struct FieldEquals {
    pub path: String,
    pub value: Value,
}

impl FieldEquals {
    pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }
}

impl RecordPredicate for FieldEquals {
    fn test(&self, record: &DecodedRecord) -> bool {
        record.path(&self.path) == Some(&self.value)
    }
}

/// `owner == key`.
pub fn owned_by(key: Pubkey) -> FieldEquals {
    FieldEquals::new("owner", key)
}

/// Record kind equals `kind` (first letter case-insensitive).
#[derive(Debug, Clone)]
pub struct KindIs(pub String);

impl RecordPredicate for KindIs {
    fn test(&self, record: &DecodedRecord) -> bool {
        same_kind(&record.kind, &self.0)
    }
}

/// Kind names compare with the first letter case-folded, so `position`
/// and `Position` name the same kind.
pub fn same_kind(a: &str, b: &str) -> bool {
    let mut ca = a.chars();
    let mut cb = b.chars();
    match (ca.next(), cb.next()) {
        (Some(x), Some(y)) => x.to_ascii_lowercase() == y.to_ascii_lowercase() && ca.eq(cb),
        (None, None) => true,
        _ => false,
    }
}

pub struct And<A, B>(A, B);
pub struct Or<A, B>(A, B);
pub struct Not<A>(A);

impl<A: RecordPredicate, B: RecordPredicate> RecordPredicate for And<A, B> {
    fn test(&self, record: &DecodedRecord) -> bool {
        self.0.test(record) && self.1.test(record)
    }
}

impl<A: RecordPredicate, B: RecordPredicate> RecordPredicate for Or<A, B> {
    fn test(&self, record: &DecodedRecord) -> bool {
        self.0.test(record) || self.1.test(record)
    }
}

impl<A: RecordPredicate> RecordPredicate for Not<A> {
    fn test(&self, record: &DecodedRecord) -> bool {
        !self.0.test(record)
    }
}

/// Combinators for any predicate.
pub trait PredicateExt: RecordPredicate + Sized {
    fn and<P: RecordPredicate>(self, other: P) -> And<Self, P> {
        And(self, other)
    }

    fn or<P: RecordPredicate>(self, other: P) -> Or<Self, P> {
        Or(self, other)
    }

    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<T: RecordPredicate> PredicateExt for T {}

/// Keep the records the predicate accepts, in order.
pub fn retain_matching<P: RecordPredicate + ?Sized>(
    records: Vec<DecodedRecord>,
    predicate: &P,
) -> Vec<DecodedRecord> {
    records.into_iter().filter(|r| predicate.test(r)).collect()
}
