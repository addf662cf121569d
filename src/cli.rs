//! CLI argument parsing for the phosphor load harness

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the load report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "phosphor")]
#[command(version)]
#[command(
    about = "Append frames to one trace from many concurrent producers and verify nothing is lost",
    long_about = None
)]
pub struct Cli {
    /// Number of concurrent producer threads
    #[arg(short = 'p', long = "producers", value_name = "N", default_value = "8")]
    pub producers: usize,

    /// Frames appended by each producer
    #[arg(short = 'n', long = "frames", value_name = "N", default_value = "100")]
    pub frames: usize,

    /// Trace id stamped on every generated frame
    #[arg(long = "trace-id", value_name = "ID", default_value = "phosphor-load")]
    pub trace_id: String,

    /// TOML file with trace configuration
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
