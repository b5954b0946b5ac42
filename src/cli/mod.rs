//! Command line interface for fibcache.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fibcache - concurrent memoized Fibonacci.
#[derive(Parser, Debug)]
#[command(name = "fibcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "fibcache.toml")]
    pub config: PathBuf,

    /// Verbose mode.
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode.
    #[arg(short, long)]
    pub quiet: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Computes the given indices concurrently on one shared cache.
    Compute {
        /// Indices to compute.
        #[arg(required = true, allow_negative_numbers = true)]
        indices: Vec<String>,

        /// Print a JSON report instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Prints every value from 0 up to the given index.
    Sequence {
        /// Last index of the sequence.
        #[arg(allow_negative_numbers = true)]
        upto: String,
    },

    /// Writes a default configuration file.
    Init {
        /// Target directory (default: current directory).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Shows the effective configuration.
    Config,

    /// Shows version.
    Version,
}
