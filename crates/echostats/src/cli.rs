//! Command line interface for the `echostats` binary.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::{EchoConfig, DEFAULT_DATABASE, DEFAULT_PORT};

/// Command line arguments for the `echostats` binary.
///
/// Without a subcommand the echo server runs.
#[derive(Debug, Parser)]
#[command(
    name = "echostats",
    version,
    about = "rot13 echo server that records per-session packet delivery"
)]
pub struct Cli {
    /// Port for both the TCP and UDP listeners.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to listen on.
    #[arg(long, default_value = "::")]
    pub bind: IpAddr,

    /// SQLite database file.
    #[arg(long, global = true, default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// Append log output to this file as well as stdout.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Milliseconds between persistence flushes.
    #[arg(long, default_value_t = 2000)]
    pub flush_interval_ms: u64,

    /// Increase verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print per-session delivery statistics from the database.
    Summary {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Send a numbered burst of instrumented UDP packets.
    Send(SendArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct SendArgs {
    /// Target `host:port`.
    pub target: String,

    /// Packets per repeat; also the announced total.
    #[arg(long, default_value_t = 100)]
    pub packets: u64,

    /// How many times the whole sequence is sent.
    #[arg(long, default_value_t = 3)]
    pub repeats: u32,

    /// Datagram size in bytes, header included.
    #[arg(long, default_value_t = 1400)]
    pub packet_len: usize,

    /// Session nonce; generated from the clock when absent.
    #[arg(long)]
    pub nonce: Option<String>,
}

impl Cli {
    /// Server configuration described by the flags.
    pub fn config(&self) -> EchoConfig {
        EchoConfig {
            listen: SocketAddr::new(self.bind, self.port),
            database: self.database.clone(),
            flush_interval: Duration::from_millis(self.flush_interval_ms),
            log_file: self.log_file.clone(),
            ..EchoConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults_match_config() {
        let cli = Cli::parse_from(["echostats"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.config(), EchoConfig::default());
    }

    #[test]
    fn parses_port_and_database() {
        let cli = Cli::parse_from(["echostats", "-p", "7778", "--database", "/tmp/x.db", "-vv"]);
        let config = cli.config();
        assert_eq!(config.listen.port(), 7778);
        assert_eq!(config.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn parses_summary() {
        let cli = Cli::parse_from(["echostats", "summary", "--json", "--database", "s.db"]);
        assert!(matches!(cli.command, Some(Command::Summary { json: true })));
        assert_eq!(cli.database, PathBuf::from("s.db"));
    }

    #[test]
    fn parses_send() {
        let cli = Cli::parse_from(["echostats", "send", "localhost:7777", "--packets", "5"]);
        let Some(Command::Send(args)) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.target, "localhost:7777");
        assert_eq!(args.packets, 5);
        assert_eq!(args.repeats, 3);
        assert_eq!(args.packet_len, 1400);
    }
}
