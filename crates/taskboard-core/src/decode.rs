#![forbid(unsafe_code)]

//! Decode boundary between loosely-typed remote documents and domain types.
//!
//! The remote store delivers documents as an id plus a JSON body. The id is
//! not part of the body, so decoding injects it under `"id"` before handing
//! the object to serde. A malformed document fails the decode with a typed
//! [`DecodeError`] instead of leaking untyped values further in.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;
use crate::model::{Board, BoardSummary, Label, Sprint, Task, TaskList};

/// A document as delivered by the subscription transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: String,
    pub data: Value,
}

impl RawDocument {
    #[must_use]
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// A domain type that can be decoded from a [`RawDocument`].
pub trait Decode: Sized {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    fn decode(doc: &RawDocument) -> Result<Self, DecodeError>;
}

/// Decode a whole snapshot. The first malformed document fails the batch.
pub fn decode_all<T: Decode>(docs: &[RawDocument]) -> Result<Vec<T>, DecodeError> {
    docs.iter().map(T::decode).collect()
}

fn decode_with_id<T: DeserializeOwned>(
    doc: &RawDocument,
    entity: &'static str,
) -> Result<T, DecodeError> {
    let Value::Object(fields) = &doc.data else {
        return Err(DecodeError::NotAnObject { id: doc.id.clone() });
    };
    let mut fields = fields.clone();
    fields.insert("id".to_owned(), Value::String(doc.id.clone()));
    serde_json::from_value(Value::Object(fields)).map_err(|source| DecodeError::Schema {
        id: doc.id.clone(),
        entity,
        source,
    })
}

macro_rules! impl_decode {
    ($ty:ty, $name:literal) => {
        impl Decode for $ty {
            const ENTITY: &'static str = $name;

            fn decode(doc: &RawDocument) -> Result<Self, DecodeError> {
                decode_with_id(doc, Self::ENTITY)
            }
        }
    };
}

impl_decode!(Board, "board");
impl_decode!(BoardSummary, "board summary");
impl_decode!(TaskList, "list");
impl_decode!(Task, "task");
impl_decode!(Label, "label");
impl_decode!(Sprint, "sprint");
