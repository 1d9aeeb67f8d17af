//! Framing header: the text line that instruments a packet.
//!
//! ```text
//! magicheader:<nonce>:<packet_num>:<total_expected>\n<payload...>
//! ```
//!
//! Payloads that do not start with the magic token are ordinary echo traffic
//! and parse to `Ok(None)`. Payloads that do start with it but carry bad
//! fields are [`HeaderError::Malformed`].

use serde::{Deserialize, Serialize};

use crate::error::HeaderError;
use crate::record::Record;

/// Magic token opening every instrumented packet.
pub const MAGIC_HEADER: &str = "magicheader";

/// One accepted packet, decoded from its framing header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reception {
    /// The magic token as it appeared on the wire. Never persisted.
    pub magic: String,
    /// Session identifier.
    pub nonce: String,
    /// Packet number within the session.
    pub packet_num: i64,
    /// Number of packets the sender intends to send.
    pub total_expected: i64,
    /// Full payload length in bytes, header included.
    pub payload_len: usize,
    /// Parse time (Unix ms).
    pub time: i64,
    /// Origin of the packet, filled in by the transport.
    pub address: Option<String>,
}

impl Reception {
    /// Attach the peer address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Convert into a persistence record, dropping internal-only fields.
    pub fn into_record(self) -> Record {
        let mut record = Record::new()
            .with("nonce", self.nonce)
            .with("packet_num", self.packet_num)
            .with("total_expected", self.total_expected)
            .with("payload_len", self.payload_len)
            .with("time", self.time);
        if let Some(address) = self.address {
            record.insert("address", address);
        }
        record
    }
}

/// Parse the framing header of a payload, stamping it with the current time.
///
/// `text` is the (lossily) decoded payload and `raw_len` its length in bytes.
pub fn parse_header(text: &str, raw_len: usize) -> Result<Option<Reception>, HeaderError> {
    parse_header_at(text, raw_len, now_millis())
}

/// Parse the framing header of a payload with an explicit timestamp.
pub fn parse_header_at(
    text: &str,
    raw_len: usize,
    now: i64,
) -> Result<Option<Reception>, HeaderError> {
    if text.len() <= MAGIC_HEADER.len() || !text.starts_with(MAGIC_HEADER) {
        return Ok(None);
    }

    let line = text.split('\n').next().unwrap_or_default();
    let malformed = |reason: &str| HeaderError::Malformed {
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = line.split(':');
    let (Some(magic), Some(nonce), Some(packet_num), Some(total_expected)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed("expected magic:nonce:packet_num:total_expected"));
    };

    let packet_num: i64 = packet_num
        .trim()
        .parse()
        .map_err(|_| malformed("packet_num is not an integer"))?;
    let total_expected: i64 = total_expected
        .trim()
        .parse()
        .map_err(|_| malformed("total_expected is not an integer"))?;

    Ok(Some(Reception {
        magic: magic.to_string(),
        nonce: nonce.to_string(),
        packet_num,
        total_expected,
        payload_len: raw_len,
        time: now,
        address: None,
    }))
}

/// Build the framing line for one packet, trailing newline included.
pub fn encode_header(nonce: &str, packet_num: u64, total_expected: u64) -> String {
    format!("{MAGIC_HEADER}:{nonce}:{packet_num}:{total_expected}\n")
}

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_valid_header() {
        let text = "magicheader:n1:3:10\nsome payload";
        let reception = parse_header_at(text, text.len(), 42).unwrap().unwrap();

        assert_eq!(reception.magic, MAGIC_HEADER);
        assert_eq!(reception.nonce, "n1");
        assert_eq!(reception.packet_num, 3);
        assert_eq!(reception.total_expected, 10);
        assert_eq!(reception.payload_len, text.len());
        assert_eq!(reception.time, 42);
        assert_eq!(reception.address, None);
    }

    #[test]
    fn test_plain_traffic_has_no_header() {
        assert_eq!(parse_header("hello world", 11).unwrap(), None);
        assert_eq!(parse_header("", 0).unwrap(), None);
        // The bare token, with nothing after it, is not a header either.
        assert_eq!(parse_header(MAGIC_HEADER, MAGIC_HEADER.len()).unwrap(), None);
        // Case-sensitive.
        assert_eq!(parse_header("MAGICHEADER:n:0:1\n", 18).unwrap(), None);
    }

    #[test]
    fn test_non_integer_fields_are_malformed() {
        let err = parse_header("magicheader:n1:x:10\n", 20).unwrap_err();
        assert!(matches!(err, HeaderError::Malformed { .. }));

        let err = parse_header("magicheader:n1:1:ten\n", 21).unwrap_err();
        assert!(matches!(err, HeaderError::Malformed { .. }));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let err = parse_header("magicheader:n1:1\nbody", 21).unwrap_err();
        assert!(matches!(
            err,
            HeaderError::Malformed { ref line, .. } if line == "magicheader:n1:1"
        ));
    }

    #[test]
    fn test_header_without_newline_uses_whole_text() {
        let reception = parse_header("magicheader:n1:0:1", 18).unwrap().unwrap();
        assert_eq!(reception.total_expected, 1);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let reception = parse_header("magicheader:n1:0:2:extra\n", 25).unwrap().unwrap();
        assert_eq!(reception.packet_num, 0);
        assert_eq!(reception.total_expected, 2);
    }

    #[test]
    fn test_carriage_return_is_tolerated() {
        let reception = parse_header("magicheader:n1:0:2\r\nbody", 24).unwrap().unwrap();
        assert_eq!(reception.total_expected, 2);
    }

    #[test]
    fn test_into_record_strips_magic() {
        let reception = parse_header_at("magicheader:n1:0:2\n", 19, 7)
            .unwrap()
            .unwrap()
            .with_address("[::1]:5000");
        let record = reception.into_record();

        assert!(!record.contains("magic"));
        assert_eq!(
            record.columns().collect::<Vec<_>>(),
            vec!["address", "nonce", "packet_num", "payload_len", "time", "total_expected"]
        );
        assert_eq!(record.get("payload_len").and_then(|v| v.as_integer()), Some(19));
    }

    #[test]
    fn test_into_record_without_address_omits_column() {
        let record = parse_header("magicheader:n1:0:2\n", 19)
            .unwrap()
            .unwrap()
            .into_record();
        assert!(!record.contains("address"));
    }

    proptest! {
        #[test]
        fn encoded_header_parses_back(
            nonce in "[A-Za-z0-9._-]{1,32}",
            total in 1u64..10_000,
            body in "[0-9]{0,64}",
        ) {
            let packet_num = total - 1;
            let text = format!("{}{}", encode_header(&nonce, packet_num, total), body);
            let reception = parse_header(&text, text.len()).unwrap().unwrap();
            prop_assert_eq!(reception.nonce, nonce);
            prop_assert_eq!(reception.packet_num, packet_num as i64);
            prop_assert_eq!(reception.total_expected, total as i64);
            prop_assert_eq!(reception.payload_len, text.len());
        }

        #[test]
        fn text_without_magic_is_never_a_header(text in "[^m].*") {
            prop_assert_eq!(parse_header(&text, text.len()).unwrap(), None);
        }
    }
}
