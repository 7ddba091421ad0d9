//! CLI tool to strip the header section from a record file.
//!
//! Usage:
//!   strip-header [input] [output]
//!
//! Every line up to and including the `end_header` sentinel is dropped; the
//! rest is copied to the output file.

use std::path::PathBuf;
use std::process;

use baton_ring::{
    Coordinator, DEFAULT_MAX_LINE_LEN, DEFAULT_SENTINEL, OverlongPolicy, RingConfig,
    SentinelMatch, TransportKind,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Copy the body of a record file, dropping its header.
#[derive(Parser)]
#[command(name = "strip-header")]
struct Cli {
    /// Input record file
    #[arg(default_value = "data.txt")]
    input: PathBuf,

    /// Output file (created or truncated)
    #[arg(default_value = "src.txt")]
    output: PathBuf,

    /// Longest accepted line in bytes, excluding the terminator
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LEN)]
    max_line_len: usize,

    /// Line that ends the header
    #[arg(long, default_value = DEFAULT_SENTINEL)]
    sentinel: String,

    /// Treat any line starting with the sentinel as the end of the header
    #[arg(long)]
    prefix_match: bool,

    /// What to do with lines longer than --max-line-len
    #[arg(long, value_enum, default_value_t = OverlongPolicy::Truncate)]
    on_overlong: OverlongPolicy,

    /// Medium between the reader and transporter stages
    #[arg(long, value_enum, default_value_t = TransportKind::Channel)]
    transport: TransportKind,

    /// Log progress on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let sentinel_match = if cli.prefix_match {
        SentinelMatch::Prefix
    } else {
        SentinelMatch::Exact
    };
    let config = RingConfig::new()
        .with_max_line_len(cli.max_line_len)
        .with_sentinel(cli.sentinel)
        .with_sentinel_match(sentinel_match)
        .with_overlong(cli.on_overlong)
        .with_transport(cli.transport);

    let result = Coordinator::new(config).and_then(|c| c.run_files(&cli.input, &cli.output));
    match result {
        Ok(report) => {
            tracing::info!(
                input = %cli.input.display(),
                output = %cli.output.display(),
                "{} lines in -> {} lines out",
                report.lines_read,
                report.lines_written
            );
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(e.exit_code());
        }
    }
}
