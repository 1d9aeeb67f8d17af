//! Registry of session trackers keyed by nonce.
//!
//! Trackers are created on the first packet naming a nonce and never
//! removed, so memory grows with the number of distinct nonces seen over the
//! life of the process.

use std::sync::Arc;

use dashmap::DashMap;

use echostats_core::{ProtocolViolation, Reception, SessionProgress, SessionTracker};
use echostats_store::{Batcher, RecordStore};

/// Concurrent nonce → [`SessionTracker`] map feeding a [`Batcher`].
pub struct SessionRegistry<S: RecordStore> {
    sessions: DashMap<String, SessionTracker>,
    batcher: Arc<Batcher<S>>,
}

impl<S: RecordStore> SessionRegistry<S> {
    pub fn new(batcher: Arc<Batcher<S>>) -> Self {
        Self {
            sessions: DashMap::new(),
            batcher,
        }
    }

    /// Account for one packet and queue it for persistence.
    ///
    /// The tracker for a new nonce is created under the map's shard lock, so
    /// concurrent first packets of one session share a single tracker. The
    /// shard lock is released before the progress line is logged.
    /// Duplicates are persisted too; rejected packets are not.
    pub fn receive(&self, reception: Reception) -> Result<SessionProgress, ProtocolViolation> {
        let mut created = false;
        let result = {
            let mut tracker = self
                .sessions
                .entry(reception.nonce.clone())
                .or_insert_with(|| {
                    created = true;
                    SessionTracker::new(reception.nonce.clone())
                });
            tracker.receive(&reception)
        };
        if created {
            tracing::debug!(nonce = %reception.nonce, "new session");
        }
        let progress = result?;

        tracing::info!(
            nonce = %progress.nonce,
            packet_num = reception.packet_num,
            duplicate = progress.duplicate,
            "{}",
            progress
        );
        self.batcher.enqueue(reception.into_record());
        Ok(progress)
    }

    /// Copy of the tracker for a nonce.
    pub fn session(&self, nonce: &str) -> Option<SessionTracker> {
        self.sessions.get(nonce).map(|t| t.value().clone())
    }

    /// Number of sessions seen.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
