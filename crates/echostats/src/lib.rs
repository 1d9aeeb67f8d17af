//! # echostats
//!
//! A rot13 echo server that doubles as a network reliability probe.
//!
//! ## Overview
//!
//! Every TCP read and every UDP datagram is echoed back rot13-transformed.
//! Buffers that start with the magic header are also instrumented:
//!
//! - **Parse**: the header names a session nonce, packet number and total
//! - **Track**: a per-nonce [`SessionTracker`] counts unique packets and bytes
//! - **Persist**: each accepted reception is batched into the database
//!
//! Instrumentation never changes the reply. A malformed header or a
//! protocol violation is logged and the buffer is echoed as usual.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use echostats::{EchoConfig, EchoServer};
//! use echostats::store::SqliteStore;
//!
//! async fn example() -> echostats::Result<()> {
//!     let config = EchoConfig::default();
//!     let store = Arc::new(SqliteStore::open(&config.database)?);
//!     EchoServer::bind(config, store).await?.run().await
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `echostats::core` - Header parsing, records and session tracking
//! - `echostats::store` - Storage abstraction, SQLite and the batcher

pub mod cli;
pub mod config;
pub mod context;
pub mod echo;
pub mod error;
pub mod logging;
pub mod registry;
pub mod report;
pub mod sender;
pub mod server;
pub mod transport;

pub use echostats_core as core;
pub use echostats_store as store;

pub use config::EchoConfig;
pub use context::ServerContext;
pub use echo::rot13;
pub use error::{EchoError, Result};
pub use registry::SessionRegistry;
pub use server::EchoServer;

pub use echostats_core::{ProtocolViolation, Reception, SessionProgress, SessionTracker};
