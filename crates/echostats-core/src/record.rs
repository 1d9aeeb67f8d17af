//! Record: the unit handed to the persistence layer.
//!
//! A record is a loose column-name → value row. Producers do not coordinate
//! on a schema, so two records in the same batch may carry different field
//! sets; the store reconciles them at write time with [`union_columns`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
}

impl FieldValue {
    /// Check if the value is SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Get the integer payload, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<usize> for FieldValue {
    fn from(v: usize) -> Self {
        FieldValue::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

/// A column-name → value row awaiting persistence.
///
/// Fields are kept sorted by name so column order is stable across a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, FieldValue>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.0.insert(name.into(), value.into())
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.0.remove(name)
    }

    /// Get a field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Get a field, treating absence as `NULL`.
    pub fn get_or_null(&self, name: &str) -> &FieldValue {
        self.0.get(name).unwrap_or(&FieldValue::Null)
    }

    /// Check whether a field is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate the defined field names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate `(name, value)` pairs in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Compute the union of field names across a batch, in sorted order.
///
/// Every record contributes `NULL` for the columns it does not define.
pub fn union_columns(records: &[Record]) -> Vec<String> {
    let columns: BTreeSet<&str> = records.iter().flat_map(Record::columns).collect();
    columns.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_columns_heterogeneous() {
        let a = Record::new().with("nonce", "n1").with("packet_num", 0i64);
        let b = Record::new()
            .with("nonce", "n1")
            .with("packet_num", 1i64)
            .with("address", "127.0.0.1:9");

        let columns = union_columns(&[a.clone(), b]);
        assert_eq!(columns, vec!["address", "nonce", "packet_num"]);
        assert_eq!(a.get_or_null("address"), &FieldValue::Null);
    }

    #[test]
    fn test_union_columns_empty_batch() {
        assert!(union_columns(&[]).is_empty());
    }

    #[test]
    fn test_option_converts_to_null() {
        let record = Record::new().with("address", None::<String>);
        assert!(record.get("address").unwrap().is_null());
    }

    #[test]
    fn test_record_serializes_as_flat_object() {
        let record = Record::new().with("nonce", "n1").with("packet_num", 3i64);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"nonce":"n1","packet_num":3}"#);
    }
}
