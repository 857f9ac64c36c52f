//! Tracing setup shared by the TUI and the helper binaries.
//!
//! The TUI owns the terminal, so it passes a log file; the headless binaries log to
//! stderr. `RUST_LOG` overrides the verbosity either way.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Trace,
}

impl Verbosity {
    #[must_use]
    pub fn to_level(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// `-q` / `-v` / `-vv` style flags from a binary's argument list.
    pub fn from_args(args: &[String]) -> Self {
        if args.iter().any(|a| a == "-q" || a == "--quiet") {
            Self::Quiet
        } else if args.iter().any(|a| a == "-vv") {
            Self::Trace
        } else if args.iter().any(|a| a == "-v" || a == "--verbose") {
            Self::Verbose
        } else {
            Self::Normal
        }
    }
}

/// Installs the global subscriber. Calling it again is a no-op.
pub fn init_logging(verbosity: Verbosity, log_file: Option<&Path>) {
    let default_filter = format!("agency_desk={}", verbosity.to_level());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let file = log_file.and_then(open_log_file);
    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = match file {
        Some(file) => registry
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
            .try_init(),
        None => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}
