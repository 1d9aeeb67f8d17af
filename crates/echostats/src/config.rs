//! Server configuration.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use echostats_store::DEFAULT_FLUSH_INTERVAL;

use crate::error::{EchoError, Result};

/// Default TCP and UDP port.
pub const DEFAULT_PORT: u16 = 7777;

/// Default SQLite database file.
pub const DEFAULT_DATABASE: &str = "echostats.db";

/// Bytes requested per TCP read.
pub const DEFAULT_TCP_READ_SIZE: usize = 4096;

/// Largest UDP datagram accepted.
pub const DEFAULT_UDP_READ_SIZE: usize = 65_536;

/// Configuration for the echo server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoConfig {
    /// Address both the TCP and UDP listeners bind to.
    pub listen: SocketAddr,
    /// SQLite database holding the receptions table.
    pub database: PathBuf,
    /// Period of the batcher's flush cycle.
    pub flush_interval: Duration,
    /// Append-only log file, in addition to stdout.
    pub log_file: Option<PathBuf>,
    pub tcp_read_size: usize,
    pub udp_read_size: usize,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), DEFAULT_PORT),
            database: PathBuf::from(DEFAULT_DATABASE),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            log_file: None,
            tcp_read_size: DEFAULT_TCP_READ_SIZE,
            udp_read_size: DEFAULT_UDP_READ_SIZE,
        }
    }
}

impl EchoConfig {
    /// Check values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.flush_interval.is_zero() {
            return Err(EchoError::Config("flush interval must be non-zero".into()));
        }
        if self.tcp_read_size == 0 || self.udp_read_size == 0 {
            return Err(EchoError::Config("read sizes must be non-zero".into()));
        }
        Ok(())
    }
}
