//! Session: the set of packets sharing a nonce.
//!
//! A [`SessionTracker`] counts which packet numbers of a session have been
//! seen and how many bytes they delivered. Duplicate deliveries are accepted
//! but never double-counted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::ProtocolViolation;
use crate::header::Reception;

/// Snapshot of a session after one accepted packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub nonce: String,
    /// Distinct packet numbers seen so far.
    pub received: usize,
    pub total_expected: i64,
    /// Bytes delivered by distinct packets.
    pub total_bytes: u64,
    /// Whether this packet number had already been seen.
    pub duplicate: bool,
}

impl SessionProgress {
    /// Check if every expected packet has arrived at least once.
    pub fn is_complete(&self) -> bool {
        self.received as i64 == self.total_expected
    }
}

impl fmt::Display for SessionProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Nonce {}: received {}/{}, total {} bytes",
            self.nonce, self.received, self.total_expected, self.total_bytes
        )
    }
}

/// Reception state for one nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTracker {
    nonce: String,
    /// Adopted from the first accepted packet, then fixed.
    total_expected: Option<i64>,
    received: BTreeSet<i64>,
    total_bytes: u64,
}

impl SessionTracker {
    /// Create a tracker for a nonce that has not delivered anything yet.
    pub fn new(nonce: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
            total_expected: None,
            received: BTreeSet::new(),
            total_bytes: 0,
        }
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// The expected packet count, once established.
    pub fn total_expected(&self) -> Option<i64> {
        self.total_expected
    }

    /// Packet numbers seen so far.
    pub fn received(&self) -> &BTreeSet<i64> {
        &self.received
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Packet numbers in `0..total_expected` that have not arrived.
    pub fn missing(&self) -> Vec<i64> {
        let Some(total) = self.total_expected else {
            return Vec::new();
        };
        (0..total).filter(|n| !self.received.contains(n)).collect()
    }

    /// Account for one packet.
    ///
    /// The first packet of a session fixes `total_expected`, even when its
    /// own packet number then turns out to be out of range. After that a
    /// rejected packet leaves the tracker unchanged.
    pub fn receive(&mut self, reception: &Reception) -> Result<SessionProgress, ProtocolViolation> {
        if reception.nonce != self.nonce {
            return Err(ProtocolViolation::NonceMismatch {
                expected: self.nonce.clone(),
                got: reception.nonce.clone(),
            });
        }

        let total_expected = match self.total_expected {
            Some(expected) if expected != reception.total_expected => {
                return Err(ProtocolViolation::TotalExpectedMismatch {
                    nonce: self.nonce.clone(),
                    expected,
                    got: reception.total_expected,
                });
            }
            Some(expected) => expected,
            None => *self.total_expected.insert(reception.total_expected),
        };

        if reception.packet_num < 0 || reception.packet_num >= total_expected {
            return Err(ProtocolViolation::PacketOutOfRange {
                nonce: self.nonce.clone(),
                packet_num: reception.packet_num,
                total_expected,
            });
        }

        let duplicate = !self.received.insert(reception.packet_num);
        if !duplicate {
            self.total_bytes += reception.payload_len as u64;
        }

        Ok(SessionProgress {
            nonce: self.nonce.clone(),
            received: self.received.len(),
            total_expected,
            total_bytes: self.total_bytes,
            duplicate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reception(nonce: &str, packet_num: i64, total_expected: i64, len: usize) -> Reception {
        Reception {
            magic: crate::MAGIC_HEADER.to_string(),
            nonce: nonce.to_string(),
            packet_num,
            total_expected,
            payload_len: len,
            time: 0,
            address: None,
        }
    }

    #[test]
    fn test_first_packet_sets_total_expected() {
        let mut tracker = SessionTracker::new("n1");
        assert_eq!(tracker.total_expected(), None);

        let progress = tracker.receive(&reception("n1", 0, 3, 100)).unwrap();
        assert_eq!(tracker.total_expected(), Some(3));
        assert_eq!(progress.received, 1);
        assert_eq!(progress.total_bytes, 100);
        assert!(!progress.duplicate);
    }

    #[test]
    fn test_progress_line() {
        let mut tracker = SessionTracker::new("n1");
        let progress = tracker.receive(&reception("n1", 2, 3, 1400)).unwrap();
        assert_eq!(progress.to_string(), "Nonce n1: received 1/3, total 1400 bytes");
    }

    #[test]
    fn test_duplicates_and_completion() {
        let mut tracker = SessionTracker::new("n1");
        tracker.receive(&reception("n1", 0, 3, 10)).unwrap();
        tracker.receive(&reception("n1", 1, 3, 20)).unwrap();

        let dup = tracker.receive(&reception("n1", 1, 3, 999)).unwrap();
        assert!(dup.duplicate);
        assert_eq!(dup.received, 2);
        assert_eq!(dup.total_bytes, 30);

        let last = tracker.receive(&reception("n1", 2, 3, 30)).unwrap();
        assert!(last.is_complete());
        assert_eq!(tracker.received().iter().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(tracker.total_bytes(), 60);
        assert!(tracker.missing().is_empty());
    }

    #[test]
    fn test_total_expected_change_is_rejected() {
        let mut tracker = SessionTracker::new("n2");
        tracker.receive(&reception("n2", 0, 5, 10)).unwrap();
        let before = tracker.clone();

        let err = tracker.receive(&reception("n2", 1, 6, 10)).unwrap_err();
        assert_eq!(
            err,
            ProtocolViolation::TotalExpectedMismatch {
                nonce: "n2".into(),
                expected: 5,
                got: 6
            }
        );
        assert_eq!(tracker, before);
    }

    #[test]
    fn test_out_of_range_packet_is_rejected() {
        let mut tracker = SessionTracker::new("n3");
        tracker.receive(&reception("n3", 0, 2, 10)).unwrap();

        assert!(matches!(
            tracker.receive(&reception("n3", 2, 2, 10)),
            Err(ProtocolViolation::PacketOutOfRange { packet_num: 2, .. })
        ));
        assert!(matches!(
            tracker.receive(&reception("n3", -1, 2, 10)),
            Err(ProtocolViolation::PacketOutOfRange { packet_num: -1, .. })
        ));
        assert_eq!(tracker.received().len(), 1);
    }

    #[test]
    fn test_rejected_first_packet_still_fixes_total() {
        let mut tracker = SessionTracker::new("n4");
        assert!(matches!(
            tracker.receive(&reception("n4", 7, 5, 10)),
            Err(ProtocolViolation::PacketOutOfRange { packet_num: 7, total_expected: 5, .. })
        ));
        assert_eq!(tracker.total_expected(), Some(5));
        assert!(tracker.received().is_empty());
        assert_eq!(tracker.total_bytes(), 0);

        let err = tracker.receive(&reception("n4", 7, 8, 10)).unwrap_err();
        assert_eq!(
            err,
            ProtocolViolation::TotalExpectedMismatch {
                nonce: "n4".into(),
                expected: 5,
                got: 8
            }
        );

        tracker.receive(&reception("n4", 4, 5, 10)).unwrap();
        assert_eq!(tracker.missing(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_zero_total_expected_rejects_everything() {
        let mut tracker = SessionTracker::new("n5");
        assert!(tracker.receive(&reception("n5", 0, 0, 10)).is_err());
    }

    #[test]
    fn test_foreign_nonce_is_rejected() {
        let mut tracker = SessionTracker::new("a");
        assert!(matches!(
            tracker.receive(&reception("b", 0, 1, 1)),
            Err(ProtocolViolation::NonceMismatch { .. })
        ));
    }

    proptest! {
        #[test]
        fn redelivery_never_changes_accounting(
            packets in prop::collection::vec((0i64..16, 1usize..2048), 1..64),
        ) {
            let mut tracker = SessionTracker::new("p");
            let mut expected_bytes = std::collections::BTreeMap::new();
            for (packet_num, len) in &packets {
                let before = tracker.clone();
                let progress = tracker.receive(&reception("p", *packet_num, 16, *len)).unwrap();
                if progress.duplicate {
                    prop_assert_eq!(tracker.total_bytes(), before.total_bytes());
                    prop_assert_eq!(tracker.received().len(), before.received().len());
                } else {
                    expected_bytes.insert(*packet_num, *len as u64);
                }
            }
            prop_assert_eq!(tracker.received().len(), expected_bytes.len());
            prop_assert_eq!(tracker.total_bytes(), expected_bytes.values().sum::<u64>());
        }
    }
}
