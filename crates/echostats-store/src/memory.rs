//! In-memory implementation of the RecordStore trait.
//!
//! This is primarily for testing. It has the same batch semantics as SQLite
//! but keeps everything in memory, records every write call, and can be told
//! to refuse writes to simulate an outage.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use echostats_core::{union_columns, FieldValue, Record};

use crate::error::{Result, StoreError};
use crate::traits::{RecordStore, SessionSummary};

/// Columns of the SQLite receptions table, for [`MemoryStore::receptions`].
pub const RECEPTION_COLUMNS: &[&str] = &[
    "nonce",
    "packet_num",
    "total_expected",
    "payload_len",
    "time",
    "address",
];

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Persisted rows, each carrying every column of its batch.
    rows: Vec<Record>,

    /// Column sets of every successful write call, in order.
    writes: Vec<Vec<String>>,

    /// When set, columns outside this set are rejected.
    schema: Option<BTreeSet<String>>,

    /// When set, every write fails.
    unavailable: bool,
}

impl MemoryStore {
    /// Create a new empty in-memory store accepting any column.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Create a store that only accepts the receptions table's columns.
    pub fn receptions() -> Self {
        Self::with_schema(RECEPTION_COLUMNS.iter().copied())
    }

    /// Create a store that only accepts the given columns.
    pub fn with_schema<'a>(columns: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                schema: Some(columns.into_iter().map(String::from).collect()),
                ..MemoryStoreInner::default()
            }),
        }
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .unavailable = unavailable;
    }

    /// All persisted rows, in insertion order.
    pub fn rows(&self) -> Vec<Record> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .clone()
    }

    /// The column set used by each successful write call.
    pub fn writes(&self) -> Vec<Vec<String>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .writes
            .clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_batch(&self, records: Vec<Record>) -> Result<usize> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;

        if inner.unavailable {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        if records.is_empty() {
            return Ok(0);
        }

        let columns = union_columns(&records);
        if let Some(schema) = &inner.schema {
            if let Some(unknown) = columns.iter().find(|c| !schema.contains(c.as_str())) {
                return Err(StoreError::UnknownColumn(unknown.clone()));
            }
        }

        let written = records.len();
        for record in records {
            let row: Record = columns
                .iter()
                .map(|c| (c.clone(), record.get_or_null(c).clone()))
                .collect();
            inner.rows.push(row);
        }
        inner.writes.push(columns);

        Ok(written)
    }

    async fn count_receptions(&self) -> Result<u64> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        Ok(inner.rows.len() as u64)
    }

    async fn receptions_for(&self, nonce: &str) -> Result<Vec<Record>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        Ok(inner
            .rows
            .iter()
            .filter(|row| row.get("nonce").and_then(FieldValue::as_text) == Some(nonce))
            .cloned()
            .collect())
    }

    async fn session_summaries(&self) -> Result<Vec<SessionSummary>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;

        let mut by_nonce: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
        for row in &inner.rows {
            if let Some(nonce) = row.get("nonce").and_then(FieldValue::as_text) {
                by_nonce.entry(nonce).or_default().push(row);
            }
        }

        let mut summaries: Vec<SessionSummary> = by_nonce
            .into_iter()
            .map(|(nonce, rows)| {
                let ints = |field: &'static str| {
                    rows.iter()
                        .filter_map(move |r| r.get(field).and_then(FieldValue::as_integer))
                };
                let unique: BTreeSet<i64> = ints("packet_num").collect();
                SessionSummary {
                    nonce: nonce.to_string(),
                    address: rows
                        .iter()
                        .filter_map(|r| r.get("address").and_then(FieldValue::as_text))
                        .min()
                        .map(String::from),
                    first_packet: ints("time").min(),
                    last_packet: ints("time").max(),
                    packets_expected: ints("total_expected").max(),
                    unique_received: unique.len() as u64,
                    received_including_duplicates: rows.len() as u64,
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.first_packet
                .cmp(&a.first_packet)
                .then_with(|| a.nonce.cmp(&b.nonce))
        });
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rows_are_normalized_to_batch_columns() {
        let store = MemoryStore::new();
        let bare = Record::new().with("nonce", "n").with("packet_num", 0i64);
        let addressed = Record::new()
            .with("nonce", "n")
            .with("packet_num", 1i64)
            .with("address", "a");

        store.insert_batch(vec![bare, addressed]).await.unwrap();

        assert_eq!(store.writes(), vec![vec!["address", "nonce", "packet_num"]]);
        let rows = store.rows();
        assert_eq!(rows[0].get("address"), Some(&FieldValue::Null));
        assert_eq!(rows[1].get("address"), Some(&FieldValue::Text("a".into())));
    }

    #[tokio::test]
    async fn test_schema_rejects_unknown_columns() {
        let store = MemoryStore::receptions();
        let err = store
            .insert_batch(vec![Record::new().with("bogus", 1i64)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn(c) if c == "bogus"));
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_writes() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(store
            .insert_batch(vec![Record::new().with("nonce", "x")])
            .await
            .is_err());

        store.set_unavailable(false);
        assert_eq!(
            store
                .insert_batch(vec![Record::new().with("nonce", "x")])
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_summaries_count_duplicates() {
        let store = MemoryStore::new();
        let row = |n: i64, t: i64| {
            Record::new()
                .with("nonce", "s")
                .with("packet_num", n)
                .with("total_expected", 4i64)
                .with("time", t)
        };
        store
            .insert_batch(vec![row(0, 5), row(1, 6), row(1, 7)])
            .await
            .unwrap();

        let summaries = store.session_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].unique_received, 2);
        assert_eq!(summaries[0].received_including_duplicates, 3);
        assert_eq!(summaries[0].first_packet, Some(5));
        assert_eq!(summaries[0].last_packet, Some(7));
        assert_eq!(summaries[0].address, None);
    }
}
