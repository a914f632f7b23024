//! taperec command-line recorder
//!
//! Captures the default input device into a WAV file.
//!
//! # Architecture
//!
//! - [`cli`]: argument parsing, config file loading and validation
//! - [`recording`]: wires the cpal backend, the WAV sink and the capture
//!   device, and waits for Ctrl-C in background mode

pub mod cli;
pub mod recording;

use cli::Cli;

/// Application entry point
///
/// Parses and validates arguments, installs the `tracing_subscriber`
/// formatter (verbose in debug builds or with `--verbose`) and records.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args()?;
    init_logging(cli.verbose);

    tracing::debug!(?cli, "Parsed command line");
    recording::record(&cli)
}

fn init_logging(verbose: bool) {
    if verbose || cfg!(debug_assertions) {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
        tracing::debug!("Verbose logging enabled");
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .compact()
            .init();
    }
}
