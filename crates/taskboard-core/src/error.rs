#![forbid(unsafe_code)]

//! Error types shared across the taskboard crates.

use thiserror::Error;

/// A string that is not a well-formed fractional order key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderKeyError {
    #[error("order key is empty")]
    Empty,
    #[error("order key is the reserved minimum")]
    Reserved,
    #[error("order key {key:?} contains non base-62 digit {digit:?}")]
    InvalidDigit { key: String, digit: char },
    #[error("order key {key:?} has an invalid integer head")]
    InvalidHead { key: String },
    #[error("order key {key:?} is shorter than its integer part")]
    Truncated { key: String },
    #[error("order key {key:?} has a trailing zero in its fraction")]
    TrailingZero { key: String },
}

/// A remote document that could not be decoded into a domain type.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("document {id:?} is not an object")]
    NotAnObject { id: String },
    #[error("document {id:?} does not match the {entity} schema: {source}")]
    Schema {
        id: String,
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Id of the offending document.
    #[must_use]
    pub fn document_id(&self) -> &str {
        match self {
            Self::NotAnObject { id } | Self::Schema { id, .. } => id,
        }
    }
}
