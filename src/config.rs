//! Command-line configuration
//!
//! Only transport and output preferences are configurable here. Credentials
//! are always entered interactively and never read from flags, environment
//! variables or files.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "statement-extractor")]
#[command(
    version,
    about = "Upload PDF bank statements and fetch the extracted transactions as CSV"
)]
pub struct Args {
    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Directory where `download` saves results (default: your Downloads folder)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Rows shown in the CSV preview after a download (0 disables the preview)
    #[arg(long, default_value_t = 10)]
    pub preview_rows: usize,
}

/// Resolved runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub request_timeout: Duration,
    pub output_dir: PathBuf,
    pub preview_rows: usize,
}

impl Config {
    pub fn from_args(args: Args) -> Self {
        let output_dir = args
            .output_dir
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            request_timeout: Duration::from_secs(args.timeout_secs),
            output_dir,
            preview_rows: args.preview_rows,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_args(Args {
            timeout_secs: 30,
            output_dir: None,
            preview_rows: 10,
        })
    }
}
