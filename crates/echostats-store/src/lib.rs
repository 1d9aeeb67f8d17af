//! # echostats Store
//!
//! Storage abstraction for echostats. Provides a trait-based interface for
//! reception persistence with SQLite and in-memory implementations, and the
//! [`Batcher`] that feeds them.
//!
//! ## Overview
//!
//! Producers never write to storage directly. They hand [`Record`]s to a
//! [`Batcher`], whose single flush task periodically drains everything
//! buffered and issues one [`RecordStore::insert_batch`] call.
//!
//! ## Key Types
//!
//! - [`RecordStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`Batcher`] - Buffered, periodically flushed writer
//! - [`SessionSummary`] - Per-nonce aggregate for reporting
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use echostats_core::Record;
//! use echostats_store::{Batcher, SqliteStore};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("echostats.db").unwrap());
//!     let batcher = Arc::new(Batcher::new(store));
//!
//!     let shutdown = CancellationToken::new();
//!     tokio::spawn(batcher.clone().run(Duration::from_secs(2), shutdown.clone()));
//!
//!     batcher.enqueue(Record::new().with("nonce", "n1").with("packet_num", 0i64));
//!     shutdown.cancel();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Variable schema**: a batch's columns are the union of its records' fields
//! - **All or nothing**: a batch is written in one transaction
//! - **Fire and forget**: failed batches are logged and dropped, never retried
//!
//! [`Record`]: echostats_core::Record

pub mod batcher;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use batcher::{Batcher, FlushOutcome, DEFAULT_FLUSH_INTERVAL};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use migration::RECEPTIONS_TABLE;
pub use sqlite::SqliteStore;
pub use traits::{RecordStore, SessionSummary};
