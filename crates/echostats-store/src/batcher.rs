//! Batcher: buffered, periodically flushed persistence.
//!
//! Any number of producers [`enqueue`](Batcher::enqueue) records. A single
//! flush task drains the buffer on a fixed interval and hands each drained
//! batch to the store as one bulk write.
//!
//! ## Flush cycle
//!
//! 1. Lock the pending buffer, move its contents into a local batch, unlock.
//! 2. If the batch is empty, skip the write.
//! 3. Otherwise write it with no lock held, so producers never wait on
//!    storage latency.
//!
//! ## Failure policy
//!
//! A failed write is logged and the batch is dropped. There is no retry and
//! no requeue; the next cycle starts from whatever arrived since the swap.

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use echostats_core::Record;

use crate::traits::RecordStore;

/// Default period between flush cycles.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(2);

/// What a single flush cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was pending; no write was issued.
    Idle,
    /// The batch was written.
    Written(usize),
    /// The write failed and the batch was discarded.
    Dropped { records: usize, error: String },
}

/// Buffers records from concurrent producers for a single background writer.
pub struct Batcher<S: RecordStore> {
    store: Arc<S>,
    pending: Mutex<Vec<Record>>,
    written: AtomicU64,
    dropped: AtomicU64,
}

impl<S: RecordStore> Batcher<S> {
    /// Create a batcher writing to `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            pending: Mutex::new(Vec::new()),
            written: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Append a record to the pending buffer.
    ///
    /// Holds the buffer lock only for the push; never touches storage.
    pub fn enqueue(&self, record: Record) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Number of records waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Total records written since creation.
    pub fn records_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Total records lost to failed writes since creation.
    pub fn records_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Swap the pending buffer for an empty one.
    fn take_pending(&self) -> Vec<Record> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        mem::take(&mut *pending)
    }

    /// Run one flush cycle.
    pub async fn flush(&self) -> FlushOutcome {
        let batch = self.take_pending();
        if batch.is_empty() {
            return FlushOutcome::Idle;
        }

        let records = batch.len();
        match self.store.insert_batch(batch).await {
            Ok(written) => {
                self.written.fetch_add(written as u64, Ordering::Relaxed);
                tracing::debug!(records = written, "flushed batch");
                FlushOutcome::Written(written)
            }
            Err(e) => {
                self.dropped.fetch_add(records as u64, Ordering::Relaxed);
                tracing::error!(records, error = %e, "could not commit records");
                FlushOutcome::Dropped {
                    records,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Flush every `period` until `shutdown` is cancelled, then flush once more.
    ///
    /// Each cycle awaits its write before the next tick is taken, so at most
    /// one write is ever in flight.
    pub async fn run(self: Arc<Self>, period: Duration, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(?period, "flush loop started");
        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,

                _ = ticker.tick() => {
                    self.flush().await;
                }
            }
        }

        let last = self.flush().await;
        tracing::debug!(
            outcome = ?last,
            written = self.records_written(),
            dropped = self.records_dropped(),
            "flush loop stopped"
        );
    }
}
