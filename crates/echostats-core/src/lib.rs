//! # echostats Core
//!
//! Pure primitives for echostats: persistence records, the packet framing
//! header, and per-session reception tracking.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! plain computation over received packets.
//!
//! ## Key Types
//!
//! - [`Record`] - A column-name → value row handed to the persistence layer
//! - [`Reception`] - One accepted packet, decoded from its framing header
//! - [`SessionTracker`] - Deduplicating reception counter for one nonce
//! - [`SessionProgress`] - Snapshot returned after each accepted packet
//!
//! ## Framing
//!
//! Instrumented packets start with a text line:
//!
//! ```text
//! magicheader:<nonce>:<packet_num>:<total_expected>\n
//! ```
//!
//! See the [`header`] module.

pub mod error;
pub mod header;
pub mod record;
pub mod session;

pub use error::{HeaderError, ProtocolViolation};
pub use header::{
    encode_header, now_millis, parse_header, parse_header_at, Reception, MAGIC_HEADER,
};
pub use record::{union_columns, FieldValue, Record};
pub use session::{SessionProgress, SessionTracker};
