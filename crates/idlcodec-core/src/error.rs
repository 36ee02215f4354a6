//! Error types for the IDLCodec decode pipeline.

use thiserror::Error;

/// Errors that can occur while decoding or encoding a single record.
///
/// Every variant describes exactly one record (or one event candidate).
/// None of them is fatal to a batch: callers isolate the failing item and
/// move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unknown record kind '{kind}'")]
    UnknownRecordKind { kind: String },

    #[error("truncated at {field} (offset {offset}): need {needed} bytes, {available} available")]
    Truncated {
        field: String,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("discriminator mismatch for '{kind}': expected {expected}, found {found}")]
    DiscriminatorMismatch {
        kind: String,
        expected: String,
        found: String,
    },

    #[error("invalid value at {field}: {reason}")]
    FieldDecode { field: String, reason: String },

    #[error("value at {field} does not fit: {reason}")]
    EncodeOverflow { field: String, reason: String },

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("type mismatch at {field}: expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    #[error("field '{field}' of '{kind}' has no fixed offset (preceded by variable-size data)")]
    NotFixedLayout { kind: String, field: String },

    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },
}

impl CodecError {
    /// Prefix the field path carried by this error with `segment`.
    ///
    /// Decoders build paths bottom-up while unwinding, so the success path
    /// never allocates. Segments starting with `[` attach without a dot.
    pub fn within(mut self, segment: &str) -> Self {
        match &mut self {
            CodecError::Truncated { field, .. }
            | CodecError::FieldDecode { field, .. }
            | CodecError::EncodeOverflow { field, .. }
            | CodecError::MissingField { field }
            | CodecError::TypeMismatch { field, .. } => {
                *field = join_path(segment, field);
            }
            _ => {}
        }
        self
    }

    /// Short, stable label for the variant. Used as a log / metric tag.
    pub fn kind(&self) -> &'static str {
        match self {
            CodecError::UnknownRecordKind { .. } => "unknown_record_kind",
            CodecError::Truncated { .. } => "truncated",
            CodecError::DiscriminatorMismatch { .. } => "discriminator_mismatch",
            CodecError::FieldDecode { .. } => "field_decode",
            CodecError::EncodeOverflow { .. } => "encode_overflow",
            CodecError::MissingField { .. } => "missing_field",
            CodecError::TypeMismatch { .. } => "type_mismatch",
            CodecError::NotFixedLayout { .. } => "not_fixed_layout",
            CodecError::InvalidPayload { .. } => "invalid_payload",
        }
    }
}

fn join_path(segment: &str, rest: &str) -> String {
    if rest.is_empty() || rest == "<root>" {
        segment.to_string()
    } else if rest.starts_with('[') {
        format!("{segment}{rest}")
    } else {
        format!("{segment}.{rest}")
    }
}

/// Errors from building or loading the schema registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IDL parse error: {0}")]
    Parse(String),

    #[error("unknown type '{ty}' in {context}")]
    UnknownType { ty: String, context: String },

    #[error("type '{name}' referenced by {context} is not defined")]
    UnresolvedType { name: String, context: String },

    #[error("record kind '{name}' defined more than once")]
    DuplicateKind { name: String },

    #[error("{category} discriminator {discriminator} shared by '{first}' and '{second}'")]
    DuplicateDiscriminator {
        category: String,
        discriminator: String,
        first: String,
        second: String,
    },

    #[error("type '{name}' contains itself without indirection")]
    RecursiveType { name: String },

    #[error("schema validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from batch orchestration.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("decode error at index {index}: {source}")]
    ItemFailed {
        index: usize,
        #[source]
        source: CodecError,
    },

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_built_outside_in() {
        let err = CodecError::Truncated {
            field: "owned".into(),
            offset: 40,
            needed: 8,
            available: 3,
        }
        .within("assets");
        match err {
            CodecError::Truncated { field, .. } => assert_eq!(field, "assets.owned"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn index_segments_attach_without_dot() {
        let err = CodecError::FieldDecode {
            field: "[2]".into(),
            reason: "bad bool".into(),
        }
        .within("flags");
        assert_eq!(
            err.to_string(),
            "invalid value at flags[2]: bad bool"
        );
    }

    #[test]
    fn unknown_kind_has_no_path() {
        let err = CodecError::UnknownRecordKind { kind: "vault".into() }.within("x");
        assert_eq!(err.kind(), "unknown_record_kind");
        assert_eq!(err.to_string(), "unknown record kind 'vault'");
    }
}
