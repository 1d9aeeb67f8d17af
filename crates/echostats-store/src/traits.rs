//! RecordStore trait: the abstract interface for reception persistence.
//!
//! The batcher only needs [`RecordStore::insert_batch`]; the query methods
//! back the summary report and tests. Implementations include SQLite
//! (primary) and in-memory (for tests).

use async_trait::async_trait;
use echostats_core::Record;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-nonce aggregate over the persisted receptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub nonce: String,
    /// Lowest peer address seen for the nonce.
    pub address: Option<String>,
    /// Earliest reception time (Unix ms).
    pub first_packet: Option<i64>,
    /// Latest reception time (Unix ms).
    pub last_packet: Option<i64>,
    pub packets_expected: Option<i64>,
    pub unique_received: u64,
    /// Every physical arrival, duplicates included.
    pub received_including_duplicates: u64,
}

/// The RecordStore trait: async interface for reception persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a batch of records as rows of the receptions table.
    ///
    /// The column set is the union of the fields defined across the batch;
    /// records contribute `NULL` for fields they lack. Either the whole batch
    /// is written or none of it is.
    ///
    /// Returns the number of rows written.
    async fn insert_batch(&self, records: Vec<Record>) -> Result<usize>;

    /// Count all persisted receptions.
    async fn count_receptions(&self) -> Result<u64>;

    /// Get every persisted reception for a nonce, oldest first.
    async fn receptions_for(&self, nonce: &str) -> Result<Vec<Record>>;

    /// Aggregate receptions per nonce, most recent session first.
    async fn session_summaries(&self) -> Result<Vec<SessionSummary>>;
}
