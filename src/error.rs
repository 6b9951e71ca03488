//! Errors raised while building, encoding or decoding attribute trees.

/// Structural error returned by tree operations, the encoder and the decoder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("duplicate key: {key}")]
    DuplicateKey { key: String },
    #[error("case-insensitive key collision: {existing} and {key}")]
    CaseCollision { existing: String, key: String },
    #[error("key not found: {key}")]
    KeyNotFound { key: String },
    #[error("attribute {key} is not a list")]
    NotAList { key: String },
    #[error("attribute {key} is not a list of complex values")]
    NotAComplexList { key: String },
    #[error("type mismatch for {field}: found {found}, expected {expected}")]
    TypeMismatch {
        field: String,
        found: &'static str,
        expected: &'static str,
    },
    #[error("attribute {name} can not hold a list value without being multi-valued")]
    InvalidSimpleAttribute { name: String },
    #[error("attribute {name} nests {depth} levels deep, at most one is allowed")]
    DepthExceeded { name: String, depth: usize },
    #[error("duplicate sub-attribute {sub} in complex attribute {name}")]
    DuplicateSubName { name: String, sub: String },
    #[error("map keys must be strings, got {key_type}")]
    InvalidMapKey { key_type: &'static str },
    #[error("unsupported type {type_name}")]
    UnsupportedType { type_name: &'static str },
    #[error("can not decode a resource into {type_name}")]
    InvalidTarget { type_name: &'static str },
    #[error("nil reference: {type_name}")]
    NilReference { type_name: &'static str },
    #[error("could not find {id:?} in attributes")]
    AttributeNotFound { id: String },
    #[error("attribute {id:?} is not a {expected}")]
    InvalidAttribute { id: String, expected: &'static str },
    #[error("invalid mapping declaration: {0}")]
    Tag(#[from] TagError),
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Error for use by hand-written `Marshal`/`Unmarshal` implementations.
    pub fn custom(msg: impl std::fmt::Display) -> Self {
        Error::Custom(msg.to_string())
    }
}

/// A field mapping declaration that could not be parsed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TagError {
    #[error("{field}: {message}")]
    Syntax { field: String, message: String },
    #[error("{field}: index range {start}-{end} is inverted")]
    InvertedRange { field: String, start: usize, end: usize },
    #[error("{field}: index {value} out of range")]
    IndexOverflow { field: String, value: String },
}
