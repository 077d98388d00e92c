//! Normalisation of one-to-one relations returned by joined queries.
//!
//! A to-one join can come back as a bare object, a one-element array, an
//! empty array or `null` depending on how the query was written. Rows are
//! decoded through [`OneOrMany`] and then collapsed with
//! [`OneOrMany::into_single`] so callers only ever see `Option<T>`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
    #[serde(skip_serializing)]
    None,
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::None
    }
}

impl<T> OneOrMany<T> {
    /// Collapse to the related record, taking the first element of an array.
    #[must_use]
    pub fn into_single(self) -> Option<T> {
        match self {
            OneOrMany::One(v) => Some(v),
            OneOrMany::Many(v) => v.into_iter().next(),
            OneOrMany::None => None,
        }
    }
}

impl<T> From<Option<OneOrMany<T>>> for OneOrMany<T> {
    fn from(value: Option<OneOrMany<T>>) -> Self {
        value.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    struct Profile {
        full_name: String,
    }

    fn decode(value: serde_json::Value) -> Option<Profile> {
        serde_json::from_value::<Option<OneOrMany<Profile>>>(value)
            .expect("decode relation")
            .and_then(OneOrMany::into_single)
    }

    #[test]
    fn object_relation_collapses() {
        let p = decode(serde_json::json!({"full_name": "Thandi"}));
        assert_eq!(p.map(|p| p.full_name).as_deref(), Some("Thandi"));
    }

    #[test]
    fn array_relation_takes_first() {
        let p = decode(serde_json::json!([{"full_name": "Thandi"}, {"full_name": "Other"}]));
        assert_eq!(p.map(|p| p.full_name).as_deref(), Some("Thandi"));
    }

    #[test]
    fn empty_or_null_relation_is_none() {
        assert_eq!(decode(serde_json::json!([])), None);
        assert_eq!(decode(serde_json::Value::Null), None);
    }
}
