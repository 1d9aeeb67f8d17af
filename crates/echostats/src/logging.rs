//! Logging setup for the binary.
//!
//! Events go to stdout and, when a log file is configured, are also appended
//! to that file without ANSI colouring. Library code only emits `tracing`
//! events; installing the subscriber is left to the binary.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{EchoError, Result};

/// Map `-v` occurrences to a level.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber.
pub fn init(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(level_for(verbosity))
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| EchoError::Logging(e.to_string()))
}
