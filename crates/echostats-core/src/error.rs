//! Error types for echostats core.

use thiserror::Error;

/// Errors raised while decoding a framing header.
///
/// A payload without the magic prefix is not an error; the parser reports it
/// as absent instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("malformed header {line:?}: {reason}")]
    Malformed { line: String, reason: String },
}

/// A packet that contradicts what its session already established.
///
/// Fatal to the packet being processed, never to the listener or to other
/// sessions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("nonce mismatch: tracker owns {expected:?}, record names {got:?}")]
    NonceMismatch { expected: String, got: String },

    #[error("nonce {nonce}: total_expected changed from {expected} to {got}")]
    TotalExpectedMismatch {
        nonce: String,
        expected: i64,
        got: i64,
    },

    #[error("nonce {nonce}: packet_num {packet_num} outside 0..{total_expected}")]
    PacketOutOfRange {
        nonce: String,
        packet_num: i64,
        total_expected: i64,
    },
}
