//! Command-line argument parsing
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PawBuddy - conversational pet-product search assistant
#[derive(Parser, Debug)]
#[command(name = "pawbuddy")]
#[command(version = "0.4.0")]
#[command(about = "Turn natural-language pet-product queries into ranked results", long_about = None)]
pub struct Args {
    /// Customer identifier for profile-seeded sessions
    #[arg(short = 'u', long)]
    pub customer: Option<String>,

    /// NLU service host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// NLU service port
    #[arg(long, default_value_t = 11434)]
    pub port: u16,

    /// Extraction model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except results)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive shopping conversation
    Chat,

    /// Run a single query and print ranked results
    Search {
        /// Natural-language query
        query: String,
    },

    /// Index a product catalog JSON file into the vector store
    Index {
        /// Path to the catalog file
        file: PathBuf,
    },

    /// Run service health checks
    Doctor,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Log filter directive for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity() {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "pawbuddy=debug,warn",
            Verbosity::VeryVerbose => "debug",
        }
    }
}
